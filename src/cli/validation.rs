use crate::cli::args::CliArgs;
use crate::model::Field;
use crate::output::OutputFormat;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if args.list && args.init_config {
        return Err("use either --list or --init-config, not both".to_string());
    }
    if !args.list {
        let listing_flags = [
            ("--search", args.search.is_some()),
            ("--sort", args.sort.is_some()),
            ("--desc", args.desc),
            ("--page", args.page.is_some()),
        ];
        if let Some((flag, _)) = listing_flags.iter().find(|(_, set)| *set) {
            return Err(format!("{flag} only applies together with --list"));
        }
    }
    if let Some(raw) = args.sort.as_deref() {
        if Field::parse(raw).is_none() {
            return Err(format!("invalid --sort '{raw}', expected one of nama_barang, stok, jumlah_terjual, tanggal_transaksi, jenis_barang"));
        }
    }
    if args.desc && args.sort.is_none() {
        return Err("--desc requires --sort".to_string());
    }
    if let Some(page) = args.page {
        if page == 0 {
            return Err("invalid --page, expected a positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid --timeout, expected a positive number of seconds".to_string());
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --output-format '{raw}', expected text or json"));
        }
    }
    Ok(())
}
