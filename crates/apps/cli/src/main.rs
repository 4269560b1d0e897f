use std::env;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use activity::{location_display, ActivityClient, ActivityDraft, LocationDisplay};
use geocode::{
    BindTarget, Binder, DecoratedLabel, LabelResolver, NominatimSource,
    DEFAULT_NOMINATIM_ENDPOINT,
};
use receipt::{ExtractionClient, ReceiptClient, ReceiptFields, ReceiptRecord, TranscriptionClient};

#[derive(Parser, Debug)]
#[command(author, version, about = "Field-activity and receipt-entry client")]
struct Args {
    /// Activity backend base URL (default: FIELDLOG_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token for the activity backend (default: FIELDLOG_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Reverse-geocoding endpoint (default: FIELDLOG_GEOCODE_URL)
    #[arg(long)]
    geocode_url: Option<String>,

    /// Label language preference for reverse geocoding
    #[arg(long, default_value = "ja")]
    language: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a human label for a coordinate pair
    Resolve {
        lat: f64,
        lon: f64,

        /// Text to fall back to when no label can be derived
        #[arg(long)]
        fallback: Option<String>,
    },

    /// List your own activity records
    Activities,

    /// List the whole team's activity records
    TeamActivities,

    /// Add an activity record
    AddActivity {
        #[arg(long)]
        activity_type: String,

        #[arg(long)]
        location: String,

        /// ISO date, e.g. 2026-08-29
        #[arg(long)]
        date: String,

        #[arg(long, default_value = "")]
        memo: String,

        #[arg(long)]
        lat: Option<f64>,

        #[arg(long)]
        lon: Option<f64>,
    },

    /// Delete an activity record by id
    DeleteActivity { id: i64 },

    /// Transcribe an audio file through the transcription backend
    Transcribe {
        /// Path to the recorded audio (webm)
        path: String,
    },

    /// Extract receipt fields from free text (prints them; does not save)
    Extract { text: String },

    /// Save a receipt with explicitly provided fields
    SaveReceipt {
        #[arg(long)]
        purchase_date: String,

        #[arg(long)]
        store_name: String,

        #[arg(long)]
        item_name: String,

        #[arg(long)]
        item_quantity: String,

        /// One of 個 / 式 / 人
        #[arg(long)]
        item_unit: String,

        #[arg(long)]
        total_amount: String,

        /// One of the fixed account titles
        #[arg(long)]
        category: String,

        #[arg(long)]
        purpose: String,
    },

    /// Show the most recently saved receipts
    Receipts,
}

/// Stdout is always live; pending labels print once resolved.
struct StdoutTarget {
    row: String,
}

impl BindTarget for StdoutTarget {
    fn is_live(&self) -> bool {
        true
    }

    fn apply(&mut self, label: &DecoratedLabel) {
        println!("{} {} {}", self.row, label.text, label.tooltip);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let api_url = args
        .api_url
        .clone()
        .or_else(|| env::var("FIELDLOG_API_URL").ok())
        .unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
    let token = args
        .token
        .clone()
        .or_else(|| env::var("FIELDLOG_TOKEN").ok())
        .unwrap_or_default();
    let geocode_url = args
        .geocode_url
        .clone()
        .or_else(|| env::var("FIELDLOG_GEOCODE_URL").ok())
        .unwrap_or_else(|| DEFAULT_NOMINATIM_ENDPOINT.to_string());
    let resolver = Arc::new(LabelResolver::new(Arc::new(NominatimSource::new(
        geocode_url,
        args.language.clone(),
    ))));
    let binder = Binder::new(resolver.clone());

    match args.command {
        Command::Resolve { lat, lon, fallback } => {
            let label = resolver
                .resolve(Some(lat), Some(lon), fallback.as_deref())
                .await;
            println!("{label}");
        }

        Command::Activities => {
            let client = ActivityClient::new(&api_url, &token);
            print_activities(client.list_mine().await?, &binder).await;
        }

        Command::TeamActivities => {
            let client = ActivityClient::new(&api_url, &token);
            print_activities(client.list_all().await?, &binder).await;
        }

        Command::AddActivity {
            activity_type,
            location,
            date,
            memo,
            lat,
            lon,
        } => {
            // Resolve a location name up front so the record carries it, the
            // way the dashboard does on map selection.
            let location_name = match (lat, lon) {
                (Some(lat), Some(lon)) => Some(
                    resolver
                        .resolve(Some(lat), Some(lon), Some(location.as_str()))
                        .await,
                ),
                _ => None,
            };
            let client = ActivityClient::new(&api_url, &token);
            client
                .create(&ActivityDraft {
                    activity_type,
                    location,
                    date,
                    memo,
                    latitude: lat,
                    longitude: lon,
                    location_name,
                })
                .await?;
            info!("activity recorded");
        }

        Command::DeleteActivity { id } => {
            let client = ActivityClient::new(&api_url, &token);
            client.delete(id).await?;
            info!("activity {id} deleted");
        }

        Command::Transcribe { path } => {
            let audio = tokio::fs::read(&path).await?;
            let client = TranscriptionClient::new(&api_url);
            let text = client.transcribe(audio, "audio.webm", "audio/webm").await?;
            println!("{text}");
        }

        Command::Extract { text } => {
            let client = ExtractionClient::new(&api_url);
            let extraction = client.extract(&text).await?;
            let fields = &extraction.fields;
            println!("購入日: {}", fields.purchase_date);
            println!("店名: {}", fields.store_name);
            println!("品名: {}", fields.item_name);
            println!("金額: {}", fields.total_amount);
            println!("個数: {}{}", fields.item_quantity, fields.item_unit);
            println!("勘定科目: {}", fields.category);
            println!("目的: {}", fields.purpose);
            if let Some(cost) = extraction.cost_jpy {
                println!("抽出費用: 約 {cost} 円");
            }
        }

        Command::SaveReceipt {
            purchase_date,
            store_name,
            item_name,
            item_quantity,
            item_unit,
            total_amount,
            category,
            purpose,
        } => {
            let record = ReceiptRecord::from_fields(&ReceiptFields {
                purchase_date,
                store_name,
                item_name,
                total_amount,
                item_quantity,
                item_unit,
                category,
                purpose,
            })?;
            let store = ReceiptClient::new(&api_url);
            store.save(&record).await?;
            info!("receipt saved");
        }

        Command::Receipts => {
            let client = ReceiptClient::new(&api_url);
            let table = client.latest().await?;
            if table.rows.is_empty() {
                println!("登録済みデータはありません");
            } else {
                println!("{}", table.headers.join(" | "));
                for row in &table.rows {
                    println!("{}", row.join(" | "));
                }
            }
        }
    }

    Ok(())
}

async fn print_activities(activities: Vec<activity::Activity>, binder: &Binder) {
    for record in &activities {
        let row = format!(
            "{} {} {}",
            record.date,
            record.username.as_deref().unwrap_or("-"),
            record.activity_type
        );
        match location_display(record, binder) {
            LocationDisplay::Ready(label) => {
                println!("{row} {} {}", label.text, label.tooltip);
            }
            LocationDisplay::Plain(text) => {
                println!("{row} {text}");
            }
            LocationDisplay::Pending(placeholder, handle) => {
                // No table to re-render here, so complete in place.
                println!("{row} {}", placeholder.loading_text);
                let mut target = StdoutTarget { row: row.clone() };
                handle.complete(&mut target).await;
            }
        }
    }
}
