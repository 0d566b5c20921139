use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;

use token_auth::keys::{pem, SigningKey, DEFAULT_KEY_BITS};
use token_auth::{
    init_tracing, inspect_unverified, Authenticator, Config, TokenRequest, VerifyOptions,
};

#[derive(Parser)]
#[command(name = "token-auth", version, about = "Issue and verify RS256 access tokens")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key pair and write private.pem / public.pem
    Keygen {
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Modulus size in bits
        #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
        bits: usize,
    },
    /// Issue an access/refresh token pair
    Issue {
        /// Subject of the tokens
        #[arg(long)]
        subject: String,
        /// Issuer, defaults to TOKEN_ISSUER
        #[arg(long)]
        issuer: Option<String>,
        /// Access token validity in seconds, defaults to ACCESS_TOKEN_TTL
        #[arg(long)]
        ttl: Option<i64>,
        /// Private claims as a JSON object
        #[arg(long)]
        claims: Option<String>,
    },
    /// Verify a token and print its claims
    Verify {
        /// Compact token, read from stdin when omitted
        token: Option<String>,
        /// Accept expired tokens
        #[arg(long)]
        no_exp: bool,
    },
    /// Decode a token without verifying it
    Inspect {
        /// Compact token, read from stdin when omitted
        token: Option<String>,
    },
    /// Print the public key set
    Jwks,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.tracing());

    match cli.command {
        Commands::Keygen { out, bits } => keygen(&out, bits)?,
        Commands::Issue {
            subject,
            issuer,
            ttl,
            claims,
        } => {
            let auth = authenticator(&config)?;
            let validity = match ttl {
                Some(secs) => Duration::try_seconds(secs).context("--ttl is out of range")?,
                None => config.access_token_ttl,
            };
            let request = TokenRequest::builder(issuer.unwrap_or_else(|| config.issuer.clone()))
                .subject(subject)
                .validity(validity)
                .claims(parse_claims(claims.as_deref())?)
                .build();
            let token = auth.issue(&request)?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        }
        Commands::Verify { token, no_exp } => {
            let auth = authenticator(&config)?;
            let mut options = config.verify_options();
            if no_exp {
                options = VerifyOptions {
                    validate_exp: false,
                    ..options
                };
            }
            let verified = auth.verify_with(read_token(token)?, &options)?;
            println!("{}", serde_json::to_string_pretty(&verified)?);
        }
        Commands::Inspect { token } => {
            let decoded = inspect_unverified(read_token(token)?)?;
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
        Commands::Jwks => {
            let auth = authenticator(&config)?;
            let document = auth.publish_key_set()?;
            println!("{}", String::from_utf8(document)?);
        }
    }

    Ok(())
}

fn authenticator(config: &Config) -> Result<Authenticator> {
    let auth = Authenticator::builder()
        .key_config(config.key_config()?)
        .verify_options(config.verify_options())
        .build()
        .context("failed to load keys")?;
    Ok(auth)
}

fn keygen(out: &Path, bits: usize) -> Result<()> {
    let key = SigningKey::generate(bits)?;
    std::fs::create_dir_all(out).with_context(|| format!("cannot create {}", out.display()))?;

    let private_path = out.join("private.pem");
    let public_path = out.join("public.pem");
    std::fs::write(&private_path, pem::encode_private_key(key.rsa())?.as_slice())
        .with_context(|| format!("cannot write {}", private_path.display()))?;
    std::fs::write(&public_path, pem::encode_public_key(key.public_key().rsa())?)
        .with_context(|| format!("cannot write {}", public_path.display()))?;

    info!(kid = %key.kid(), bits, "Key pair written");
    println!("{}", key.kid());
    Ok(())
}

fn parse_claims(raw: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str(raw).context("--claims is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("--claims must be a JSON object"),
    }
}

fn read_token(arg: Option<String>) -> Result<String> {
    if let Some(token) = arg {
        return Ok(token);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("cannot read token from stdin")?;
    Ok(buf.trim().to_string())
}
