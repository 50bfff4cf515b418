use kinoframes::catalog::JsonCatalog;
use kinoframes::error::*;
use kinoframes::opts::{InfoArgs, Opts, RequestArgs};
use kinoframes::orchestrator;
use kinoframes::request::{dissect_comment, RequestKind};
use kinoframes::resolve::{Services, SubtitleFrameResolver};
use kinoframes::subtitles::SubtitleMatcher;
use kinoframes::video::{FfmpegBackend, VideoInfo};
use slog::{Drain, Logger};
use structopt::StructOpt;

fn main() {
    let exit_code = run();

    std::process::exit(exit_code)
}

// This separate method is needed for slog_async to flush properly
fn run() -> i32 {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    let log = slog::Logger::root(drain, slog::o!());

    if let Err(err) = try_run(&log) {
        slog::error!(log, "Encountered error"; "kind" => %err.kind(), "description" => %err);

        for cause in err.iter().skip(1) {
            slog::error!(log, "Underlying error"; "description" => %cause);
        }

        return 1;
    }

    0
}

fn try_run(log: &Logger) -> Result<()> {
    match Opts::from_args() {
        Opts::Request(args) => request(log, args, None),
        Opts::Gif(args) => request(log, args, Some(RequestKind::Gif)),
        Opts::Info(args) => info(log, args),
    }
}

fn request(log: &Logger, args: RequestArgs, force_kind: Option<RequestKind>) -> Result<()> {
    let settings = args.settings();
    let catalog = JsonCatalog::load(&args.catalog)?;
    let backend = FfmpegBackend::new(settings.tools.clone());
    let captioner = settings.captioner()?;

    let mut request = dissect_comment(&args.comment)?;
    request.id = args.id;
    request.user = args.user;
    request.on_demand = true;
    if let Some(kind) = force_kind {
        request.kind = kind;
    }

    let services = Services {
        catalog: &catalog,
        matcher: &SubtitleMatcher,
        backend: &backend,
        captioner: captioner.as_ref(),
    };
    let resolver = SubtitleFrameResolver::new(services);

    let outcome = orchestrator::handle_request(log, request, &resolver, &services, &settings)?;
    let json = serde_json::to_string_pretty(&outcome).context("failed to serialize outcome")?;
    println!("{}", json);

    Ok(())
}

fn info(log: &Logger, args: InfoArgs) -> Result<()> {
    let info = VideoInfo::read(log, &args.common.tools(), &args.video)?;
    let json = serde_json::to_string_pretty(&info).context("failed to serialize video info")?;
    println!("{}", json);

    Ok(())
}
