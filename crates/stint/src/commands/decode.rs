//! Decode command - read a session written by `stint encode`.

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow, bail};
use clap::Args;
use stint_codec::{AnyValue, FormatSerializer, StructuredInstance, StructuredReader};
use stint_session::{Session, SharedSession};

use super::{Context, Format, read_input};

/// Arguments for the decode command.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Encoded input file (`-` for stdin)
    pub input: PathBuf,

    /// Wire format
    #[arg(long, value_enum, default_value_t = Format::Data)]
    pub format: Format,
}

/// Run the decode command.
pub fn run(args: DecodeArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;
    let text = read_input(&args.input)?;

    let value = match args.format {
        Format::Data => {
            let bytes = hex::decode(text.trim()).context("input is not valid hex")?;
            config.data_registry()?.decode(bytes)?
        }
        Format::Structured => {
            let instance: StructuredInstance =
                serde_json::from_str(&text).context("input is not a structured instance")?;
            let chain = config.structured_chain([])?;
            chain.from_data(&mut StructuredReader::new(instance))?
        }
    };

    let Some(value) = value else {
        bail!("no configured codec recognised the input");
    };
    let session = into_session(value)?;

    if ctx.json_output {
        println!("{}", serde_json::to_string(&session)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&session)?);
    }
    Ok(())
}

fn into_session(value: AnyValue) -> Result<Session> {
    let value = match value.downcast::<Session>() {
        Ok(session) => return Ok(*session),
        Err(value) => value,
    };
    value
        .downcast::<SharedSession>()
        .map(|shared| shared.read().clone())
        .map_err(|_| anyhow!("decoded value is not a session"))
}
