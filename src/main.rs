use std::path::PathBuf;
use std::time::Duration;

use dirfuzz_rs::candidates::CaseRule;
use dirfuzz_rs::config::{ScanOptions, DEFAULT_MAX_BODY_BYTES, DEFAULT_USER_AGENT};
use dirfuzz_rs::output::{self, OutputFormat};
use dirfuzz_rs::types::{ScanReport, Summary};
use dirfuzz_rs::{scanner, wordlist};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// dirfuzz-rs — Fast async web content discovery fuzzer.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dirfuzz-rs",
    version,
    about = "Recursively probe a web server for hidden files and directories.",
    long_about = None
)]
struct Cli {
    /// Target URL (scheme optional), e.g. http://10.0.0.5/app/
    #[arg(short = 'u', long = "url")]
    url: String,

    /// Path to the wordlist file (.gz files are decompressed).
    #[arg(short = 'w', long, default_value = "wordlist.txt")]
    wordlist: PathBuf,

    /// Number of concurrent workers.
    #[arg(short = 't', long, default_value_t = 20)]
    threads: usize,

    /// Per-request timeout in seconds.
    #[arg(short = 'T', long, default_value_t = 10)]
    timeout: u64,

    /// Comma-separated extensions appended to every word, e.g. php,html
    #[arg(short = 'x', long, default_value = "")]
    extensions: String,

    /// Case variants to generate for every word.
    #[arg(long = "case", value_enum, value_delimiter = ',')]
    cases: Vec<CaseRule>,

    /// Status codes to report, with inclusive ranges, e.g. 200,301-303
    #[arg(short = 'c', long = "status", default_value = "200,204,301,302,307,401,403")]
    status: String,

    /// Content-length ranges to report, e.g. 100-200,512
    #[arg(short = 's', long = "size", default_value = "")]
    size: String,

    /// Report only responses with a header containing a value, e.g. "Content-Type: text/html"
    #[arg(long = "match-header")]
    match_header: Vec<String>,

    /// Report only responses whose body matches this regex (repeatable).
    #[arg(short = 'r', long = "match-regex")]
    match_regex: Vec<String>,

    /// Report only responses whose body contains one of these keywords.
    #[arg(short = 'k', long = "match-keyword", value_delimiter = ',')]
    match_keyword: Vec<String>,

    /// Never report responses whose body contains one of these keywords.
    #[arg(long = "ignore-keyword", value_delimiter = ',')]
    ignore_keyword: Vec<String>,

    /// Never report responses whose body matches this regex (repeatable).
    #[arg(short = 'i', long = "ignore")]
    ignore_regex: Vec<String>,

    /// Extensions that are never requested, e.g. .png,.jpg
    #[arg(long = "ignore-ext", value_delimiter = ',')]
    ignore_ext: Vec<String>,

    /// Directories that are never recursed into, e.g. /cgi-bin/
    #[arg(long = "ignore-dir", value_delimiter = ',')]
    ignore_dir: Vec<String>,

    /// Disable recursion into discovered directories.
    #[arg(long = "no-recursion", default_value_t = false)]
    no_recursion: bool,

    /// Maximum recursion depth.
    #[arg(long = "max-depth", default_value_t = 3)]
    max_depth: usize,

    /// HTTP method to use.
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Custom request header "Name: value" (repeatable).
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body sent with every request.
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Use HTTPS instead of HTTP.
    #[arg(long, default_value_t = false)]
    https: bool,

    /// Follow redirects instead of reporting 3xx responses.
    #[arg(long = "follow-redirects", default_value_t = false)]
    follow_redirects: bool,

    /// Accept invalid TLS certificates.
    #[arg(short = 'K', long, default_value_t = false)]
    insecure: bool,

    /// User-Agent header value.
    #[arg(long = "user-agent", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Maximum number of body bytes captured per response.
    #[arg(long = "max-body-bytes", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Write results to this path ("-" for stdout).
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence.
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            target: self.url.clone(),
            use_https: self.https,
            method: self.method.clone(),
            threads: self.threads,
            timeout: Duration::from_secs(self.timeout),
            extensions: self.extensions.clone(),
            ignored_extensions: self.ignore_ext.clone(),
            cases: self.cases.clone(),
            status_filter: self.status.clone(),
            size_filter: self.size.clone(),
            header_filters: self.match_header.clone(),
            regex_filters: self.match_regex.clone(),
            keywords: self.match_keyword.clone(),
            ignore_keywords: self.ignore_keyword.clone(),
            ignore_regexes: self.ignore_regex.clone(),
            recursion: !self.no_recursion,
            max_depth: self.max_depth,
            ignored_dirs: self.ignore_dir.clone(),
            headers: self.headers.clone(),
            body: self.data.clone(),
            follow_redirects: self.follow_redirects,
            insecure: self.insecure,
            user_agent: self.user_agent.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli
        .scan_options()
        .build()
        .context("invalid scan configuration")?;
    let words = wordlist::load_wordlist_from_path(&cli.wordlist)
        .context("failed to load wordlist")?;

    println!("dirfuzz-rs configuration:");
    println!("  target       : {}", config.target);
    println!("  wordlist     : {} ({} words)", cli.wordlist.display(), words.len());
    println!("  method       : {}", config.method);
    println!("  threads      : {}", config.threads);
    println!("  timeout      : {}s", cli.timeout);
    println!(
        "  extensions   : {}",
        if config.extensions.is_empty() {
            "<none>".to_string()
        } else {
            config.extensions.join(",")
        }
    );
    println!("  status       : {}", config.filters.status);
    println!(
        "  recursion    : {}",
        if config.recursion.enabled {
            format!("on (max depth {})", config.recursion.max_depth)
        } else {
            "off".to_string()
        }
    );
    println!(
        "  output       : {}",
        cli.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );

    let report = scanner::run_scan(config, words).await?;

    print_results_table(&report);
    print_summary(&report.summary, report.elapsed, report.cancelled);

    if let Some(path) = cli.output.as_deref() {
        let written = output::open_sink(cli.format, Some(path))
            .and_then(|mut sink| output::write_report(sink.as_mut(), &report));
        match written {
            Ok(()) => println!("Wrote {} results to {}", report.results.len(), path.display()),
            Err(e) => eprintln!(
                "{} failed to write results to {}: {e}",
                "warning:".yellow().bold(),
                path.display()
            ),
        }
    }

    Ok(())
}

fn print_results_table(report: &ScanReport) {
    let mut url_w = "url".len();
    for r in &report.results {
        url_w = url_w.max(r.url.len().min(80));
    }
    let status_w = "status".len();
    let len_w = "length".len().max(8);

    println!("\nFound: {} (requests: {})", report.results.len(), report.summary.total);
    println!(
        "{:>status_w$}  {:>len_w$}  {:<url_w$}",
        "status",
        "length",
        "url",
        status_w = status_w,
        len_w = len_w,
        url_w = url_w
    );
    println!(
        "{:-<status_w$}  {:-<len_w$}  {:-<url_w$}",
        "",
        "",
        "",
        status_w = status_w,
        len_w = len_w,
        url_w = url_w
    );
    for r in &report.results {
        let status = r.status_code.to_string();
        let status = match r.status_code {
            200..=299 => status.green(),
            300..=399 => status.cyan(),
            400..=499 => status.yellow(),
            _ => status.red(),
        };
        println!(
            "{:>status_w$}  {:>len_w$}  {:<url_w$}",
            status,
            r.content_length,
            r.url,
            status_w = status_w,
            len_w = len_w,
            url_w = url_w
        );
    }
}

fn print_summary(summary: &Summary, wall: Duration, cancelled: bool) {
    let ms = |d: Duration| format!("{}ms", d.as_millis());
    println!();
    if cancelled {
        println!("{}", "Scan interrupted, summary is partial.".yellow());
    }
    println!("{}", "Summary:".bold());
    println!("  Total requests............: {}", summary.total);
    println!("  Successful requests.......: {}", summary.successful.to_string().green());
    println!("  Failed requests...........: {}", summary.failed.to_string().red());
    println!("  Percentage of successful..: {:.2}%", summary.success_rate());
    println!("  Total time................: {}", ms(summary.total_time));
    println!("  Average time..............: {}", ms(summary.average_time()));
    println!("  Fastest time..............: {}", ms(summary.fastest_time()));
    println!("  Slowest time..............: {}", ms(summary.slowest_time()));
    println!("  Wall clock................: {}", ms(wall));
}
