//! Encode command - write a session in a configured wire format.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use serde_json::json;
use stint_codec::{FormatSerializer, StructuredWriter};
use tracing::debug;

use super::{Context, Format, read_session};

/// Arguments for the encode command.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Session JSON file (`-` for stdin)
    pub session: PathBuf,

    /// Wire format
    #[arg(long, value_enum, default_value_t = Format::Data)]
    pub format: Format,
}

/// Run the encode command.
pub fn run(args: EncodeArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;
    let session = read_session(&args.session)?;

    match args.format {
        Format::Data => {
            let registry = config.data_registry()?;
            let Some(bytes) = registry.encode(&session)? else {
                bail!("no data serializer is configured for sessions");
            };
            debug!(session_id = session.id(), len = bytes.len(), "Encoded session frame");

            let encoded = hex::encode(&bytes);
            if ctx.json_output {
                let output = json!({
                    "format": "data",
                    "session_id": session.id(),
                    "bytes": bytes.len(),
                    "hex": encoded,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{encoded}");
            }
        }
        Format::Structured => {
            let chain = config.structured_chain([])?;
            let mut writer = StructuredWriter::new();
            if !chain.to_data(&session, &mut writer)? {
                bail!("no structured serializer accepted the session");
            }
            let instance = writer.finish()?;
            println!("{}", serde_json::to_string_pretty(&instance)?);
        }
    }

    Ok(())
}
