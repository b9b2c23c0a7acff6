//! Output Parsing Example
//!
//! This example resolves templates through an index and parses captured
//! device output into structured records.
//!
//! # Usage
//!
//! Bundled samples against the bundled template tree:
//! ```bash
//! RUST_LOG=debug cargo run --example parse_output
//! ```
//!
//! Your own capture against an ntc-templates checkout:
//! ```bash
//! cargo run --example parse_output -- --templates ~/ntc-templates/ntc_templates/templates \
//!     --platform cisco_ios --command "show ip int brief" --file capture.txt
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;

use ferrissh_textfsm::{ParseError, ParserBuilder, Resolution};

/// A captured command and its raw output
struct Sample {
    platform: &'static str,
    command: &'static str,
    output: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        platform: "cisco_ios",
        command: "sh ver",
        output: "\
Cisco IOS Software, C2960 Software (C2960-LANBASEK9-M), Version 15.0(2)SE11, RELEASE SOFTWARE (fc3)
ROM: Bootstrap program is C2960 boot loader

switch01 uptime is 2 weeks, 3 days, 4 hours, 5 minutes
System returned to ROM by power-on
System image file is \"flash:/c2960-lanbasek9-mz.150-2.SE11.bin\"

cisco WS-C2960-24TT-L (PowerPC405) processor (revision B0) with 65536K bytes of memory.
Processor board ID FOC1234X0YZ
Configuration register is 0xF
",
    },
    Sample {
        platform: "cisco_ios",
        command: "show ip interface brief",
        output: "\
Interface              IP-Address      OK? Method Status                Protocol
GigabitEthernet0/0     10.0.0.1        YES NVRAM  up                    up
GigabitEthernet0/1     unassigned      YES unset  administratively down down
Loopback0              192.0.2.1       YES NVRAM  up                    up
",
    },
    Sample {
        platform: "arista_eos",
        command: "show vlan",
        output: "\
VLAN  Name                             Status    Ports
----- -------------------------------- --------- -------------------------------
1     default                          active    Et1, Et2, Et3
10    users                            active    Et4
20    voice                            suspended
",
    },
    Sample {
        platform: "juniper_junos",
        command: "show version",
        output: "Hostname: vmx1\nModel: vmx\n",
    },
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== Ferrissh TextFSM Output Parsing Example ===\n");
    println!("Template directory: {}", args.templates.display());

    let parser = ParserBuilder::new(&args.templates).build();
    parser.reload()?;
    println!("Platforms: {}", parser.platforms().join(", "));

    if let (Some(platform), Some(command), Some(file)) = (&args.platform, &args.command, &args.file)
    {
        let output = fs::read_to_string(file)?;
        println!("{}", parser.parse_to_json(platform, command, &output)?);
        return Ok(());
    }

    for sample in SAMPLES {
        println!("\n{}", "=".repeat(60));
        println!("Platform: {}", sample.platform);
        println!("Command:  {}", sample.command);
        println!("{}", "=".repeat(60));

        match parser.resolve(sample.platform, sample.command) {
            Resolution::Found(template) => println!(
                "Template: {} ({:?} match on '{}')",
                template.template_name, template.match_kind, template.command_pattern
            ),
            Resolution::UnsupportedPlatform => println!("Template: (platform not in index)"),
            Resolution::NoMatch => println!("Template: (no matching command)"),
        }

        match parser.parse_outcome(sample.platform, sample.command, sample.output) {
            Ok(outcome) => {
                if outcome.records.is_empty() {
                    println!("(no records parsed)");
                } else {
                    println!("{}", serde_json::to_string_pretty(&outcome.records)?);
                }
                for warning in &outcome.warnings {
                    println!("warning: {}", warning);
                }
            }
            Err(ParseError::UnsupportedPlatform { platform }) => {
                println!("Skipping: no templates for {}", platform);
            }
            Err(e) => eprintln!("Parse error: {}", e),
        }
    }

    // Programmatic access
    println!("\n{}", "=".repeat(60));
    println!("Interfaces that are DOWN:");
    println!("{}", "=".repeat(60));

    let records = parser.parse("cisco_ios", "sh ip int br", SAMPLES[1].output)?;
    for record in records
        .iter()
        .filter(|r| r.get_str("STATUS").is_some_and(|s| s.ends_with("down")))
    {
        println!(
            "  {} - Status: {}, Protocol: {}",
            record.get_str("INTERFACE").unwrap_or_default(),
            record.get_str("STATUS").unwrap_or_default(),
            record.get_str("PROTO").unwrap_or_default(),
        );
    }

    Ok(())
}

/// Simple argument parser
struct Args {
    templates: PathBuf,
    platform: Option<String>,
    command: Option<String>,
    file: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut templates = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"));
        let mut platform = None;
        let mut command = None;
        let mut file = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--templates" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        templates = PathBuf::from(&args[i]);
                    }
                }
                "--platform" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        platform = Some(args[i].clone());
                    }
                }
                "--command" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        command = Some(args[i].clone());
                    }
                }
                "--file" | "-f" => {
                    i += 1;
                    if i < args.len() {
                        file = Some(PathBuf::from(&args[i]));
                    }
                }
                "--help" => {
                    println!("Usage: parse_output [OPTIONS]");
                    println!();
                    println!("Options:");
                    println!("  -t, --templates <DIR>   Template directory holding 'index'");
                    println!("  -p, --platform <NAME>   Platform of the captured output");
                    println!("  -c, --command <CMD>     Command that produced the output");
                    println!("  -f, --file <PATH>       File holding the captured output");
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            templates,
            platform,
            command,
            file,
        }
    }
}
