use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    apply_specification_args,
    cli::PreviewArgs,
    config::LoadConfig,
    ensure_specification,
    loader::{ParsedLine, RowStream, build_table_schema, resolve_encoding},
    table,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let mut config = LoadConfig::default();
    apply_specification_args(&mut config, &args.spec);
    config.input_encoding = args.input_encoding.clone();
    ensure_specification(&config)?;

    let encoding = resolve_encoding(&config)?;
    let schema = build_table_schema(&config)
        .with_context(|| format!("Deriving schema from {:?}", config.specification))?;
    let mut stream = RowStream::open(&args.data, &schema, encoding)?;
    let mut rows = Vec::new();

    while rows.len() < args.rows {
        let Some(parsed) = stream.next() else {
            break;
        };
        match parsed {
            Ok(ParsedLine::Row { row, .. }) => rows.push(row),
            Ok(ParsedLine::Blank { .. }) => {}
            Err(err) if err.is_row_level() => warn!("{err}"),
            Err(err) => {
                return Err(err).with_context(|| format!("Reading {:?}", args.data));
            }
        }
    }

    print!("{}", table::render_rows(&schema, &rows));
    info!("Displayed {} row(s) from {:?}", rows.len(), args.data);
    Ok(())
}
