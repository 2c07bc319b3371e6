//! OrbitKV CLI
//!
//! Interactive shell over an embedded in-memory engine. Useful for poking
//! at the client API without a running cluster.
//!
//! ```text
//! > space users
//! > put users alice s:name=alice n:age=30
//! > get users alice
//! > range users age 20 40
//! ```

use std::io::{self, BufRead, Write};

use clap::Parser;

use orbitkv::client::{IntAttrs, RangePredicates, StringAttrs};
use orbitkv::{Client, Config, MemoryEngine, OrbitError, Row};

/// OrbitKV interactive shell
#[derive(Parser, Debug)]
#[command(name = "orbitkv-cli")]
#[command(about = "Interactive shell for the OrbitKV client")]
struct Args {
    /// Spaces to provision at startup
    #[arg(short, long)]
    space: Vec<String>,
}

fn main() -> orbitkv::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::builder();
    for space in &args.space {
        config = config.space(space);
    }
    let engine = MemoryEngine::open(config.build())?;
    let mut client = Client::new(engine);

    println!("orbitkv {} -- type 'help' for commands", orbitkv::VERSION);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else {
            continue;
        };

        match command {
            "quit" | "exit" => break,
            "help" => print_help(),
            _ => {
                if let Err(message) = dispatch(&mut client, command, rest) {
                    println!("error: {message}");
                }
            }
        }
    }

    Ok(())
}

fn dispatch(
    client: &mut Client<MemoryEngine>,
    command: &str,
    args: &[&str],
) -> Result<(), String> {
    match command {
        "space" => {
            let [name] = args else {
                return Err("usage: space <name>".to_string());
            };
            client.engine().create_space(name);
            println!("ok");
            Ok(())
        }
        "put" => {
            let (space, key, fields) = split_target(args, "put <space> <key> <field>...")?;
            let (strings, ints) = parse_fields(fields)?;
            client
                .put(space, key.as_bytes(), &strings, &ints)
                .map_err(render)?;
            println!("ok");
            Ok(())
        }
        "get" => {
            let [space, key] = args else {
                return Err("usage: get <space> <key>".to_string());
            };
            match client.get(space, key.as_bytes()).map_err(render)? {
                Some(row) => print_row(&row),
                None => println!("(not found)"),
            }
            Ok(())
        }
        "del" => {
            let [space, key] = args else {
                return Err("usage: del <space> <key>".to_string());
            };
            let deleted = client.delete(space, key.as_bytes()).map_err(render)?;
            println!("{}", if deleted { "ok" } else { "(not found)" });
            Ok(())
        }
        "add" | "sub" | "mul" | "div" | "rem" => {
            let (space, key, fields) = split_target(args, "add <space> <key> <name>=<n>...")?;
            let (strings, ints) = parse_fields(fields)?;
            if !strings.is_empty() {
                return Err("arithmetic takes n: fields only".to_string());
            }
            let result = match command {
                "add" => client.atomic_add(space, key.as_bytes(), &ints),
                "sub" => client.atomic_sub(space, key.as_bytes(), &ints),
                "mul" => client.atomic_mul(space, key.as_bytes(), &ints),
                "div" => client.atomic_div(space, key.as_bytes(), &ints),
                _ => client.atomic_rem(space, key.as_bytes(), &ints),
            };
            result.map_err(render)?;
            println!("ok");
            Ok(())
        }
        "append" | "prepend" => {
            let (space, key, fields) = split_target(args, "append <space> <key> <name>=<s>...")?;
            let (strings, ints) = parse_fields(fields)?;
            if !ints.is_empty() {
                return Err("string mutation takes s: fields only".to_string());
            }
            let result = if command == "append" {
                client.string_append(space, key.as_bytes(), &strings)
            } else {
                client.string_prepend(space, key.as_bytes(), &strings)
            };
            result.map_err(render)?;
            println!("ok");
            Ok(())
        }
        "search" => {
            let Some((&space, fields)) = args.split_first() else {
                return Err("usage: search <space> <field|r:name=lo..hi>...".to_string());
            };
            let (strings, ints, ranges) = parse_predicates(fields)?;
            let mut rows = Vec::new();
            client
                .search(space, &strings, &ints, &ranges, &mut rows)
                .map_err(render)?;
            print_rows(&rows);
            Ok(())
        }
        "range" => {
            let [space, attr, lower, upper] = args else {
                return Err("usage: range <space> <attr> <lower> <upper>".to_string());
            };
            let lower: u64 = lower.parse().map_err(|_| "lower bound must be a number")?;
            let upper: u64 = upper.parse().map_err(|_| "upper bound must be a number")?;
            let mut rows = Vec::new();
            client
                .range_search(space, attr, lower, upper, &mut rows)
                .map_err(render)?;
            print_rows(&rows);
            Ok(())
        }
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

/// Split `<space> <key> fields...` off an argument list
fn split_target<'a>(
    args: &'a [&'a str],
    usage: &str,
) -> Result<(&'a str, &'a str, &'a [&'a str]), String> {
    match args {
        [space, key, fields @ ..] => Ok((*space, *key, fields)),
        _ => Err(format!("usage: {usage}")),
    }
}

/// Parse `s:name=value` / `n:name=value` fields; bare fields are strings
fn parse_fields(fields: &[&str]) -> Result<(StringAttrs, IntAttrs), String> {
    let mut strings = StringAttrs::new();
    let mut ints = IntAttrs::new();

    for field in fields {
        let (prefix, body) = match field.split_once(':') {
            Some(("s", body)) => ("s", body),
            Some(("n", body)) => ("n", body),
            _ => ("s", *field),
        };
        let (name, value) = body
            .split_once('=')
            .ok_or_else(|| format!("field '{field}' is not name=value"))?;
        if prefix == "n" {
            let value: u64 = value
                .parse()
                .map_err(|_| format!("field '{field}': value must be a number"))?;
            ints.insert(name.to_string(), value);
        } else {
            strings.insert(name.to_string(), value.to_string());
        }
    }

    Ok((strings, ints))
}

/// Parse search predicates: scalar fields plus `r:name=lo..hi` ranges
fn parse_predicates(
    fields: &[&str],
) -> Result<(StringAttrs, IntAttrs, RangePredicates), String> {
    let mut scalars = Vec::new();
    let mut ranges = RangePredicates::new();

    for field in fields {
        if let Some(body) = field.strip_prefix("r:") {
            let (name, bounds) = body
                .split_once('=')
                .ok_or_else(|| format!("range '{field}' is not r:name=lo..hi"))?;
            let (lower, upper) = bounds
                .split_once("..")
                .ok_or_else(|| format!("range '{field}' is not r:name=lo..hi"))?;
            let lower: u64 = lower
                .parse()
                .map_err(|_| format!("range '{field}': bounds must be numbers"))?;
            let upper: u64 = upper
                .parse()
                .map_err(|_| format!("range '{field}': bounds must be numbers"))?;
            ranges.insert(name.to_string(), (lower, upper));
        } else {
            scalars.push(*field);
        }
    }

    let (strings, ints) = parse_fields(&scalars)?;
    Ok((strings, ints, ranges))
}

fn render(err: OrbitError) -> String {
    err.to_string()
}

fn print_row(row: &Row) {
    match serde_json::to_string_pretty(row) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("error rendering row: {err}"),
    }
}

fn print_rows(rows: &[Row]) {
    for row in rows {
        print_row(row);
    }
    println!("({} rows)", rows.len());
}

fn print_help() {
    println!("commands:");
    println!("  space <name>                        create a space");
    println!("  put <space> <key> <field>...        store attributes");
    println!("  get <space> <key>                   fetch a record");
    println!("  del <space> <key>                   delete a record");
    println!("  add|sub|mul|div|rem <space> <key> <name>=<n>...");
    println!("  append|prepend <space> <key> <name>=<s>...");
    println!("  search <space> <field|r:name=lo..hi>...");
    println!("  range <space> <attr> <lower> <upper>");
    println!("  quit");
    println!();
    println!("fields: s:name=value (string, default) or n:name=value (integer)");
}
