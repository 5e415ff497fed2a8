use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pawtrip_agents::{build_agent_from_env, PetTravelAgent};
use pawtrip_core::{ChatInput, MapLinker, WeatherOutcome, WeatherService};
use pawtrip_integrations::{IntegrationConfig, KmaWeatherClient, NaverMapLinker};
use pawtrip_observability::{init_tracing, AppMetrics};

#[derive(Debug, Parser)]
#[command(name = "pawtrip")]
#[command(about = "Pet travel assistant CLI")]
struct Cli {
    /// Overrides PAWTRIP_PLACE_CATALOG for this run.
    #[arg(long, env = "PAWTRIP_PLACE_CATALOG")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer one question and exit.
    Ask {
        text: String,
        /// Print the full reply as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Interactive session.
    Chat,
    /// Show categories and extracted fields.
    Classify { text: String },
    /// Run retrieval only and print the merged places.
    Places { text: String },
    /// Current observation for a region.
    Weather { region: String },
    /// Naver map link for a place title.
    Link {
        title: String,
        #[arg(long)]
        city: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("pawtrip_cli");
    let cli = Cli::parse();

    if let Some(catalog) = cli.catalog.as_ref() {
        std::env::set_var("PAWTRIP_PLACE_CATALOG", catalog);
    }

    match cli.command {
        Command::Ask { text, json } => {
            let agent = build_agent()?;
            let reply = agent.handle_query(ChatInput { text }).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                println!("{}", reply.reply_text);
            }
        }
        Command::Chat => run_chat(build_agent()?).await?,
        Command::Classify { text } => {
            let analysis = build_agent()?.analyze(&text).await;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Command::Places { text } => {
            let agent = build_agent()?;
            let analysis = agent.analyze(&text).await;
            let aggregation = agent
                .aggregator()
                .aggregate(&text, &analysis.categories, &analysis.parsed)
                .await;

            for category in aggregation.bundle.categories() {
                println!("[{}]", category.label_ko());
                for place in aggregation.bundle.get(category) {
                    println!(
                        "- {} ({:?}) {}",
                        place.title,
                        place.source,
                        place.address_text()
                    );
                }
            }
            println!("{:#?}", aggregation.report);
        }
        Command::Weather { region } => {
            let client = KmaWeatherClient::from_config(&IntegrationConfig::from_env())
                .context("weather client unavailable")?;
            match client
                .get_weather(&region)
                .await
                .context("weather lookup failed")?
            {
                WeatherOutcome::Observed(snapshot) => {
                    println!("{}", serde_json::to_string_pretty(&snapshot)?)
                }
                WeatherOutcome::Unavailable { reason } => println!("{reason}"),
            }
        }
        Command::Link { title, city } => {
            let link = NaverMapLinker
                .build_map_link(&title, city.as_deref())
                .context("could not build map link")?;
            println!("{link}");
        }
    }

    Ok(())
}

fn build_agent() -> Result<PetTravelAgent> {
    let (agent, _) = build_agent_from_env(AppMetrics::shared())?;
    Ok(agent)
}

async fn run_chat(agent: PetTravelAgent) -> Result<()> {
    println!("Pawtrip chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = agent
            .handle_query(ChatInput {
                text: message.to_string(),
            })
            .await;

        println!("\n{}\n", reply.reply_text);

        if !reply.degraded_sections.is_empty() {
            println!("(일부 정보를 불러오지 못했습니다: {:?})\n", reply.degraded_sections);
        }
    }

    Ok(())
}
