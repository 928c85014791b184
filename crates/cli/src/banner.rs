//! Startup banner

use owo_colors::OwoColorize;

const LOGO: &str = r" ____  __   __ _   _   ____  ____
/ ___| \ \ / /| \ | | / ___||  _ \
\___ \  \ V / |  \| || |    | |_) |
 ___) |  | |  | |\  || |___ |  _ <
|____/   |_|  |_| \_| \____||_| \_\";

/// Version, license and usage lines shown under the logo
pub fn banner_text() -> String {
    format!(
        "Syncr {}\n\
         Licensed under the Apache License, Version 2.0\n\n\
         Drag the source/target folders into this window\n\
         And press [Enter] to confirm\n\
         To terminate Syncr, press [CTRL] + [C]\n",
        env!("CARGO_PKG_VERSION"),
    )
}

/// Print the banner to stdout
pub fn print_banner() {
    println!("{}", LOGO.cyan().bold());
    println!();
    println!("{}", banner_text());
}
