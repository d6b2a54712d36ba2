use clap::{Parser, Subcommand};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use url::Url;

use rule_router::{NewRule, RulePatch};

#[derive(Parser)]
#[command(name = "rule-cli")]
#[command(about = "Management CLI for the rule router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: Url,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check router status
    Health,
    /// Create a rule
    Create {
        #[arg(long)]
        domain: String,
        /// Literal subdomain, `*` for any, `!` for none
        #[arg(long)]
        subdomain: Option<String>,
        /// Literal path, `*` for any, `!` for none
        #[arg(long)]
        path: Option<String>,
        /// Comma-separated allowed query keys. Omit to allow all.
        #[arg(long, conflicts_with = "no_query")]
        query: Option<String>,
        /// Reject requests that carry any query parameter
        #[arg(long)]
        no_query: bool,
        #[arg(long)]
        target: String,
        /// Expiry as Unix seconds
        #[arg(long)]
        expires_at: u64,
    },
    /// Fetch one rule by id
    Get { id: String },
    /// List rules
    List {
        /// Only rules that have not expired
        #[arg(long)]
        active: bool,
    },
    /// Change a rule's target or expiry
    Update {
        id: String,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        expires_at: Option<u64>,
    },
    /// Delete a rule
    Delete { id: String },
    /// Remove expired rules
    Prune {
        /// Prune as of this earlier Unix time. Later values are capped at now.
        #[arg(long)]
        now: Option<u64>,
    },
    /// Resolve a request to its target rule
    Resolve {
        #[command(flatten)]
        request: ResolveArgs,
        /// Show every matching rule with its score
        #[arg(long)]
        explain: bool,
    },
}

#[derive(clap::Args)]
struct ResolveArgs {
    #[arg(long)]
    domain: String,
    #[arg(long)]
    subdomain: Option<String>,
    #[arg(long)]
    path: Option<String>,
    /// Comma-separated query keys present on the request
    #[arg(long)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let api = Api {
        client: reqwest::Client::new(),
        base: cli.url,
    };

    let res = match cli.command {
        Commands::Health => api.request(Method::GET, &["health"])?.send().await?,
        Commands::Create {
            domain,
            subdomain,
            path,
            query,
            no_query,
            target,
            expires_at,
        } => {
            let query = if no_query {
                Some(Vec::new())
            } else {
                query.map(|q| split_keys(&q))
            };
            let body = NewRule {
                domain,
                subdomain,
                path,
                query,
                target,
                expires_at,
            };
            api.request(Method::POST, &["rules"])?.json(&body).send().await?
        }
        Commands::Get { id } => api.request(Method::GET, &["rules", &id])?.send().await?,
        Commands::List { active } => {
            let mut req = api.request(Method::GET, &["rules"])?;
            if active {
                req = req.query(&[("active", "true")]);
            }
            req.send().await?
        }
        Commands::Update {
            id,
            target,
            expires_at,
        } => {
            let patch = RulePatch { target, expires_at };
            api.request(Method::PATCH, &["rules", &id])?
                .json(&patch)
                .send()
                .await?
        }
        Commands::Delete { id } => api.request(Method::DELETE, &["rules", &id])?.send().await?,
        Commands::Prune { now } => {
            let mut req = api.request(Method::POST, &["prune"])?;
            if let Some(now) = now {
                req = req.query(&[("now", now)]);
            }
            req.send().await?
        }
        Commands::Resolve { request, explain } => {
            let segments: &[&str] = if explain {
                &["resolve", "explain"]
            } else {
                &["resolve"]
            };
            let mut params = vec![("domain", request.domain)];
            params.extend(request.subdomain.map(|s| ("subdomain", s)));
            params.extend(request.path.map(|p| ("path", p)));
            params.extend(request.query.map(|q| ("query", q)));
            api.request(Method::GET, segments)?
                .query(&params)
                .send()
                .await?
        }
    };

    print_response(res).await
}

struct Api {
    client: reqwest::Client,
    base: Url,
}

impl Api {
    /// Build a request whose path is made of percent-encoded segments, so
    /// rule ids containing `/` survive as a single segment.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, String> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| format!("{} cannot be used as a base URL", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(self.client.request(method, url))
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status == reqwest::StatusCode::NO_CONTENT {
        println!("{}", status);
        return Ok(());
    }
    if !status.is_success() {
        eprintln!("Error: router returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
