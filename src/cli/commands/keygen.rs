use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use crate::auth::keys::DEFAULT_KEY_BITS;
use crate::auth::RsaKeyPair;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct KeygenArgs {
    #[arg(long, default_value = "./private.pem", help = "Where to write the PKCS#8 PEM private key")]
    pub out: PathBuf,

    #[arg(long, default_value_t = DEFAULT_KEY_BITS, help = "RSA modulus size")]
    pub bits: usize,

    #[arg(long, help = "Overwrite an existing key file")]
    pub force: bool,
}

pub async fn handle(args: KeygenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    if args.bits < DEFAULT_KEY_BITS {
        anyhow::bail!("Key size must be at least {} bits", DEFAULT_KEY_BITS);
    }
    if args.out.exists() && !args.force {
        anyhow::bail!("{} already exists (use --force to replace it)", args.out.display());
    }

    let bits = args.bits;
    let keys = tokio::task::spawn_blocking(move || RsaKeyPair::generate(bits)).await??;
    tokio::fs::write(&args.out, keys.private_pem()?).await?;

    output_success(
        &output_format,
        &format!("Wrote {}-bit private key to {}", bits, args.out.display()),
        Some(json!({
            "path": args.out.display().to_string(),
            "public_key": keys.public_key().to_header_value(),
        })),
    )
}
