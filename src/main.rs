use anyhow::{anyhow, Result};
use calloop::EventLoop;
use calloop::channel::{Event, Sender};
use clap::Parser;
use log::warn;
use quickfind::config::{load_config, Engine};
use quickfind::model::Candidate;
use quickfind::session::{SearchSession, SessionState};
use quickfind::sources::Source;
use quickfind::sources::lines::LinesSource;
use quickfind::sources::static_items::{StaticSource, STATIC_PROVIDER};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::thread;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Query to rank candidates against
    #[arg(default_value = "")]
    query: String,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read candidates from a file, one per line (repeatable)
    #[arg(short, long = "file")]
    files: Vec<PathBuf>,

    /// Only show results of this provider
    #[arg(short, long)]
    group: Option<String>,

    /// Maximum number of results to print
    #[arg(short, long)]
    limit: Option<usize>,

    /// Matching engine
    #[arg(short, long, value_enum)]
    engine: Option<Engine>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Do not read candidates from stdin
    #[arg(long)]
    no_stdin: bool,
}

enum ProviderEvent {
    Batch { provider: String, items: Vec<Candidate> },
    Finished { provider: String },
}

fn spawn_source(source: Box<dyn Source>, batch_size: usize, tx: Sender<ProviderEvent>) {
    thread::spawn(move || {
        let provider = source.name().to_string();
        let result = source.scan(batch_size, &mut |items| {
            let _ = tx.send(ProviderEvent::Batch { provider: provider.clone(), items });
        });
        if let Err(err) = result {
            warn!("Source {} failed: {:#}", provider, err);
        }
        let _ = tx.send(ProviderEvent::Finished { provider });
    });
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // 1. Load Config
    let mut config = load_config(args.config.as_deref())?;
    if let Some(engine) = args.engine {
        config.general.engine = engine;
    }
    let limit = args.limit.unwrap_or(config.general.limit);
    let batch_size = config.general.batch_size;

    // 2. Collect sources
    let mut sources: Vec<Box<dyn Source>> = Vec::new();
    if let Some(items) = config.provider(STATIC_PROVIDER).map(|p| p.items.clone()) {
        if !items.is_empty() {
            sources.push(Box::new(StaticSource::new(items)));
        }
    }
    for path in &args.files {
        sources.push(Box::new(LinesSource::file(path.clone())));
    }
    if !args.no_stdin && !std::io::stdin().is_terminal() {
        sources.push(Box::new(LinesSource::stdin()));
    }

    // 3. Init session
    let mut session = SearchSession::new(config)?;
    session.set_query(&args.query);
    session.set_active_group(args.group.clone());
    session.begin(sources.iter().map(|s| s.name().to_string()));

    // 4. Spawn one loader per source, batches come back over the channel
    let mut event_loop: EventLoop<SearchSession> = EventLoop::try_new()?;
    let (tx, rx) = calloop::channel::channel::<ProviderEvent>();
    for source in sources {
        spawn_source(source, batch_size, tx.clone());
    }
    drop(tx);

    event_loop
        .handle()
        .insert_source(rx, |event, _, session: &mut SearchSession| match event {
            Event::Msg(ProviderEvent::Batch { provider, items }) => {
                session.add_batch(&provider, items);
            }
            Event::Msg(ProviderEvent::Finished { provider }) => session.finish(&provider),
            Event::Closed => session.finish_all(),
        })
        .map_err(|e| anyhow!("failed to register provider channel: {}", e.error))?;

    // 5. Run Loop
    while session.state() != SessionState::Stable {
        event_loop.dispatch(None, &mut session)?;
    }

    // 6. Print
    let records = session.records(limit);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            println!("{:>6}  [{}] {}", record.score, record.provider, record.highlighted);
        }
    }

    Ok(())
}
