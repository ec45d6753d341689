use anyhow::{bail, Context, Result};
use clap::Parser;
use mailbridge::{config::Config, domain::MergeVariables, telemetry, Mailer};
use std::collections::HashMap;
use tracing::info;

/// Send an email through the configured provider
#[derive(Debug, Parser)]
#[command(name = "mailbridge", version)]
struct Args {
    /// Sender address
    #[arg(long)]
    from: String,

    #[arg(long)]
    subject: String,

    /// Plain-text body, may contain %recipient.<key>% placeholders
    #[arg(long)]
    text: String,

    /// HTML body, may contain %recipient.<key>% placeholders
    #[arg(long)]
    html: Option<String>,

    #[arg(long)]
    reply_to: Option<String>,

    /// Tag for providers that support it (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Merge variable as EMAIL:KEY=VALUE (repeatable)
    #[arg(long = "var")]
    vars: Vec<String>,

    /// Recipient addresses
    #[arg(required = true)]
    to: Vec<String>,
}

/// Parse EMAIL:KEY=VALUE
fn parse_var(raw: &str) -> Result<(String, String, String)> {
    let Some((email, assignment)) = raw.split_once(':') else {
        bail!("Invalid --var {:?}, expected EMAIL:KEY=VALUE", raw);
    };
    let Some((key, value)) = assignment.split_once('=') else {
        bail!("Invalid --var {:?}, expected EMAIL:KEY=VALUE", raw);
    };
    Ok((email.to_string(), key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    telemetry::init(&config.telemetry);

    let mut vars: HashMap<String, MergeVariables> = HashMap::new();
    for raw in &args.vars {
        let (email, key, value) = parse_var(raw)?;
        vars.entry(email).or_default().insert(key, value);
    }

    let mailer = Mailer::new(&config.email).context("Failed to initialise mailer")?;
    info!(backend = %mailer.backend(), "Mailer ready");

    // Recipients with variables are added individually so each gets its own values
    let plain: Vec<&String> = args.to.iter().filter(|to| !vars.contains_key(*to)).collect();
    let mut message = mailer.new_message(&args.from, &args.subject, &args.text, plain)?;

    if let Some(html) = &args.html {
        message.set_html(html);
    }
    if let Some(reply_to) = &args.reply_to {
        message.set_reply_to(reply_to);
    }
    for tag in &args.tags {
        message.add_tag(tag);
    }
    for to in &args.to {
        if let Some(recipient_vars) = vars.remove(to) {
            message.add_recipient_and_variables(to, recipient_vars)?;
        }
    }

    mailer.send(&message).await.context("Failed to send email")?;
    info!(recipients = args.to.len(), "Email sent");

    Ok(())
}
