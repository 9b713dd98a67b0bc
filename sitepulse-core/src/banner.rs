use colored::Colorize;

const BANNER: &str = r"
     _ _                   _
 ___(_) |_ ___ _ __  _   _| |___  ___
/ __| | __/ _ \ '_ \| | | | / __|/ _ \
\__ \ | ||  __/ |_) | |_| | \__ \  __/
|___/_|\__\___| .__/ \__,_|_|___/\___|
              |_|
";

pub fn print_banner() {
    eprintln!("{}", BANNER.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "sitemap resolver & URL health checker".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
