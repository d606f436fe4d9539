use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stockview",
    version,
    about = "terminal product inventory viewer",
    long_about = "stockview fetches the product list from a product CRUD API and lets you search, sort, page through, add, edit and delete products.\n\nExamples:\n  stockview -u http://localhost:3000\n  stockview -u http://localhost:3000 --list --search kopi --sort stok --desc\n  STOCKVIEW_API_BASE_URL=http://localhost:3000 stockview --list -o json\n\nTip: Use --init-config once and set base_url in ~/.stockview/config.yml."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Format for --list: text or json."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'u',
        long = "bu",
        visible_alias = "base-url",
        value_name = "URL",
        help_heading = "API",
        help = "Product API base URL (falls back to STOCKVIEW_API_BASE_URL, then the config file)."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 't',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "API",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "nrf",
        visible_alias = "no-refresh-on-failure",
        help_heading = "API",
        help = "Keep the current list when a create/update/delete is rejected instead of re-fetching it."
    )]
    pub no_refresh_on_failure: bool,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Config",
        help = "Path to config file (defaults to ~/.stockview/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Config",
        help = "Write a commented config template to the config path and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'l',
        long = "ls",
        visible_alias = "list",
        help_heading = "Listing",
        help = "Print one page of the product table and exit instead of starting the shell."
    )]
    pub list: bool,

    #[arg(
        short = 's',
        long = "q",
        visible_alias = "search",
        value_name = "TEXT",
        help_heading = "Listing",
        help = "Case-insensitive search across every column."
    )]
    pub search: Option<String>,

    #[arg(
        long = "sort",
        value_name = "FIELD",
        help_heading = "Listing",
        help = "Sort column: nama_barang, stok, jumlah_terjual, tanggal_transaksi, jenis_barang (or name, stock, sold, date, category)."
    )]
    pub sort: Option<String>,

    #[arg(
        long = "desc",
        help_heading = "Listing",
        help = "Sort descending (requires --sort)."
    )]
    pub desc: bool,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "Listing",
        help = "Page to print (1-based, 5 rows per page)."
    )]
    pub page: Option<usize>,
}
