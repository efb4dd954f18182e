//! Command-line argument parsing for store-uptime

/// Parse command line arguments
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    pub once: bool,
    pub validate: bool,
    pub help: bool,
    pub output: Option<String>,
}

pub fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from(&args)
}

/// Parse an argument list whose first element is the program name
pub fn parse_args_from(args: &[String]) -> Args {
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--once" => result.once = true,
            "--validate" => result.validate = true,
            "--help" | "-h" => result.help = true,
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    i += 1;
                    result.output = Some(args[i].clone());
                    result.once = true; // Writing a file implies a single report
                }
            }
            _ => {}
        }
        i += 1;
    }

    result
}

pub fn print_help() {
    println!("store-uptime - Store uptime/downtime reports\n");
    println!("USAGE:");
    println!("    store-uptime [OPTIONS]\n");
    println!("OPTIONS:");
    println!("    --once                  Generate a single report and exit");
    println!("    --output, -o PATH       Report path for --once (default: <REPORT_OUTPUT_DIR>/report.csv)");
    println!("    --validate              Validate configuration and exit");
    println!("    --help, -h              Show this help message\n");
    println!("Without options the HTTP server is started:");
    println!("    POST /trigger_report            start a report, returns its id");
    println!("    GET  /get_report?report_id=ID   status or finished CSV\n");
    println!("ENVIRONMENT:");
    println!("    STORE_STATUS_CSV, MENU_HOURS_CSV, TIMEZONES_CSV, REPORT_OUTPUT_DIR,");
    println!("    DEFAULT_TIMEZONE, HTTP_PORT (a .env file is read if present)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_default() {
        let result = parse_args_from(&args(&["store-uptime"]));
        assert_eq!(result, Args::default());
    }

    #[test]
    fn test_parse_args_once() {
        let result = parse_args_from(&args(&["store-uptime", "--once"]));
        assert!(result.once);
        assert!(!result.validate);
        assert!(result.output.is_none());
    }

    #[test]
    fn test_parse_args_validate() {
        let result = parse_args_from(&args(&["store-uptime", "--validate"]));
        assert!(result.validate);
    }

    #[test]
    fn test_parse_args_help() {
        assert!(parse_args_from(&args(&["store-uptime", "--help"])).help);
        assert!(parse_args_from(&args(&["store-uptime", "-h"])).help);
    }

    #[test]
    fn test_parse_args_output_implies_once() {
        let result = parse_args_from(&args(&["store-uptime", "--output", "out.csv"]));
        assert!(result.once);
        assert_eq!(result.output, Some("out.csv".to_string()));
    }

    #[test]
    fn test_parse_args_output_missing_value() {
        let result = parse_args_from(&args(&["store-uptime", "-o"]));
        assert!(!result.once);
        assert!(result.output.is_none());
    }

    #[test]
    fn test_parse_args_unknown_ignored() {
        let result = parse_args_from(&args(&["store-uptime", "--verbose", "--once"]));
        assert!(result.once);
    }
}
