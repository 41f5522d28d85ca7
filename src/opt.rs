use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "domsink", about = "Scans pages for inline scripts touching DOM XSS sinks")]
pub struct Opt {
    #[structopt(short, long, help = "Path to the file containing URLs (stdin by default)")]
    pub file: Option<String>,

    #[structopt(short, long, default_value = "5", help = "Number of concurrent workers")]
    pub concurrency: usize,

    #[structopt(
        short = "l",
        long = "rate-limit",
        default_value = "1000",
        help = "Rate limit in milliseconds between requests"
    )]
    pub rate_limit: u64,

    #[structopt(short, long, help = "Report fetch errors and clean pages, not just findings")]
    pub verbose: bool,

    #[structopt(short, long, help = "Honor the Retry-After header on HTTP 429")]
    pub retry_after: bool,
}
