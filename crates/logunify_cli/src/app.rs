//! Wiring of producers and sinks for one run.
//!
//! Everything fallible happens before the first event flows: the log store
//! is opened, the remote session is established and every sink is created.
//! Only then are the producers started and the coordinator spawned.

use crate::config::Config;
use crate::dump::JsonLinesSink;
use crate::flags::{FlagError, Flags};
use color_eyre::eyre::{Result, WrapErr, eyre};
use logunify_core::{CommandDescriptor, VersionTag};
use logunify_log::{LogStore, RecordReader, SplitLog, StoreMode};
use logunify_remote::{RemoteMirror, RemoteRole, RetryPolicy, Session, TransportError};
use logunify_replay::{ReplayConfig, ReplayEngine};
use logunify_runtime::{
    Coordinator, EventSender, FanoutPlan, FanoutReport, RunMode, RuntimeError, Shell, SinkKind,
    Supervisor, TelemetrySink, event_channel, run_init,
};
use logunify_tui::{TuiApp, TuiConfig, ViewerSink, viewer_channel};
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where the events of a run come from, ready to start
enum Producer {
    Live(Shell),
    FileReplay(RecordReader<File>),
    RemoteReplay(RecordReader<TcpStream>),
}

/// Everything a run needs before its first event
struct Prepared {
    commands: Vec<CommandDescriptor>,
    producer: Producer,
    mirror: Option<RemoteMirror>,
    store: Option<LogStore>,
}

/// Run until the producers are done or shutdown is requested
///
/// # Errors
///
/// Returns error on any fatal startup condition or if the viewer fails
pub async fn run(flags: &Flags, config: Option<&Config>) -> Result<FanoutReport> {
    let plan = FanoutPlan::resolve(&flags.run_options());
    info!(mode = %plan.mode(), sinks = ?plan.sinks(), "starting run");

    let cancel = CancellationToken::new();
    watch_ctrl_c(cancel.clone());

    let prepared = match plan.mode() {
        RunMode::Live => prepare_live(flags, config, &cancel).await?,
        RunMode::ReplayFromFile => prepare_file_replay(flags).await?,
        RunMode::ReplayFromRemote => prepare_remote_replay(flags, &cancel).await?,
    };
    let Some(mut prepared) = prepared else {
        info!("shutdown requested before the run started");
        return Ok(FanoutReport::default());
    };

    let (coordinator, viewer) = build_sinks(&plan, flags, &mut prepared).await?;

    let (tx, rx) = event_channel();
    let producer = start_producer(prepared.producer, &prepared.commands, flags, tx, &cancel);
    let fanout = tokio::spawn(coordinator.run(rx));

    let mut viewer_result = Ok(());
    if let Some(mut app) = viewer {
        viewer_result = tokio::task::spawn_blocking(move || app.run())
            .await
            .wrap_err("viewer thread panicked")?;
        debug!("viewer closed");
        cancel.cancel();
    }

    producer.await.wrap_err("producer task panicked")?;
    let report = fanout.await.wrap_err("fan-out task panicked")?;
    cancel.cancel();
    viewer_result.wrap_err("viewer failed")?;

    Ok(report)
}

fn watch_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("interrupted, shutting down");
                    cancel.cancel();
                }
                Err(error) => warn!(%error, "cannot listen for Ctrl-C"),
            },
        }
    });
}

async fn prepare_live(
    flags: &Flags,
    config: Option<&Config>,
    cancel: &CancellationToken,
) -> Result<Option<Prepared>> {
    let config = config.ok_or_else(|| eyre!("a config file is required when recording"))?;
    let commands = config.descriptors();
    if commands.is_empty() {
        return Err(RuntimeError::NoCommands.into());
    }

    let shell = Shell::detect()?;
    info!(shell = %shell.program().display(), commands = commands.len(), "resolved shell");
    run_init(&shell, &config.init).await?;

    let version = VersionTag::current();
    let store = open_log_for_writing(flags, &version, &commands).await?;

    let mirror = match flags.remote_role() {
        Some(role) => {
            let Some(mut session) = establish(&role, cancel).await? else {
                return Ok(None);
            };
            let mirror = RemoteMirror::start(&mut session, &version, &commands)
                .await
                .wrap_err("cannot send the stream header to the peer")?;
            Some(mirror)
        }
        None => None,
    };

    Ok(Some(Prepared {
        commands,
        producer: Producer::Live(shell),
        mirror,
        store,
    }))
}

async fn prepare_file_replay(flags: &Flags) -> Result<Option<Prepared>> {
    let path = flags.logfile.as_deref().ok_or(FlagError::NothingToReplay)?;
    let mut store = LogStore::open(Some(path), StoreMode::Read).await?;
    let header = store
        .read_header(&VersionTag::current())
        .await
        .wrap_err_with(|| format!("cannot read the header of {}", path.display()))?;
    if header.commands.is_empty() {
        return Err(RuntimeError::NoCommands)
            .wrap_err_with(|| format!("{} holds no commands", path.display()));
    }
    info!(path = %path.display(), commands = header.commands.len(), "replaying log file");

    Ok(Some(Prepared {
        commands: header.commands,
        producer: Producer::FileReplay(store.take_reader()?),
        mirror: None,
        store: None,
    }))
}

async fn prepare_remote_replay(
    flags: &Flags,
    cancel: &CancellationToken,
) -> Result<Option<Prepared>> {
    let role = flags.remote_role().ok_or(FlagError::NothingToReplay)?;
    let Some(mut session) = establish(&role, cancel).await? else {
        return Ok(None);
    };
    let mut reader = session.take_reader()?;

    let expected = VersionTag::current();
    let header = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(None),
        header = reader.read_header(&expected) => {
            header.wrap_err("cannot read the stream header from the peer")?
        }
    };
    if header.commands.is_empty() {
        return Err(RuntimeError::NoCommands).wrap_err("the peer sent no commands");
    }
    info!(peer = %session.peer(), commands = header.commands.len(), "replaying remote stream");

    // The received stream is recorded under the version it was sent with
    let store = open_log_for_writing(flags, &header.version, &header.commands).await?;

    Ok(Some(Prepared {
        commands: header.commands,
        producer: Producer::RemoteReplay(reader),
        mirror: None,
        store,
    }))
}

async fn open_log_for_writing(
    flags: &Flags,
    version: &VersionTag,
    commands: &[CommandDescriptor],
) -> Result<Option<LogStore>> {
    let Some(path) = flags.logfile.as_deref().filter(|_| flags.has_logfile()) else {
        return Ok(None);
    };
    let mut store = LogStore::open(Some(path), StoreMode::Write).await?;
    store
        .write_header(version, commands)
        .await
        .wrap_err_with(|| format!("cannot write the log header to {}", path.display()))?;
    info!(path = %path.display(), "recording to log file");
    Ok(Some(store))
}

/// `None` when shutdown was requested while waiting for the peer
async fn establish(role: &RemoteRole, cancel: &CancellationToken) -> Result<Option<Session>> {
    info!(%role, "establishing remote session");
    match Session::establish(role, &RetryPolicy::default(), cancel).await {
        Ok(session) => {
            info!(peer = %session.peer(), "remote session established");
            Ok(Some(session))
        }
        Err(TransportError::Cancelled) => Ok(None),
        Err(error) => Err(error).wrap_err_with(|| format!("cannot {role}")),
    }
}

async fn build_sinks(
    plan: &FanoutPlan,
    flags: &Flags,
    prepared: &mut Prepared,
) -> Result<(Coordinator, Option<TuiApp>)> {
    let mut coordinator = Coordinator::new();
    let mut viewer = None;

    for &kind in plan.sinks() {
        match kind {
            SinkKind::RemoteMirror => {
                if let Some(mirror) = prepared.mirror.take() {
                    coordinator.push(Box::new(mirror));
                }
            }
            SinkKind::LocalLog => {
                if let Some(store) = prepared.store.take() {
                    coordinator.push(Box::new(store));
                }
            }
            SinkKind::SplitLog => {
                let base = flags.logfile.as_deref().ok_or(FlagError::SplitLogWithoutLogfile)?;
                let split = SplitLog::create(base, &prepared.commands).await?;
                coordinator.push(Box::new(split));
            }
            SinkKind::Viewer => {
                let (tx, rx) = viewer_channel();
                let config = TuiConfig {
                    max_lines: flags.max_lines(),
                    ..TuiConfig::default()
                };
                viewer = Some(TuiApp::new(&prepared.commands, rx, &config));
                coordinator.push(Box::new(ViewerSink::new(tx)));
            }
            SinkKind::Dump => coordinator.push(Box::new(JsonLinesSink::stdout())),
            SinkKind::Telemetry => coordinator.push(Box::new(TelemetrySink::new())),
        }
    }

    debug!(sinks = coordinator.len(), "sinks ready");
    Ok((coordinator, viewer))
}

fn start_producer(
    producer: Producer,
    commands: &[CommandDescriptor],
    flags: &Flags,
    tx: EventSender,
    cancel: &CancellationToken,
) -> JoinHandle<()> {
    match producer {
        Producer::Live(shell) => {
            let mut tasks = Supervisor::new(shell, tx, cancel.clone()).spawn_all(commands);
            tokio::spawn(async move {
                while let Some(joined) = tasks.join_next().await {
                    if let Err(error) = joined {
                        warn!(%error, "supervisor task failed");
                    }
                }
                debug!("all commands finished");
            })
        }
        Producer::FileReplay(reader) => replay(reader, flags, tx, cancel),
        Producer::RemoteReplay(reader) => replay(reader, flags, tx, cancel),
    }
}

fn replay<R>(
    reader: RecordReader<R>,
    flags: &Flags,
    tx: EventSender,
    cancel: &CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let config = ReplayConfig::default().with_pacing(flags.pacing());
    let mut engine = ReplayEngine::new(reader)
        .with_config(config)
        .with_cancellation(cancel.clone());
    tokio::spawn(async move {
        if let Err(error) = engine.run(tx).await {
            warn!(%error, "replay failed");
        }
    })
}
