use clap::{App, Arg, SubCommand};
use mmqueue::{error_str, Consumer, Producer, QueueConfig, QueuePaths};
use std::{path::Path, process, thread, time::Duration};

fn main() {
    env_logger::init();

    let matches = App::new("mmq")
        .version(env!("CARGO_PKG_VERSION"))
        .about("SPMC message queue over memory-mapped files")
        .subcommand(
            SubCommand::with_name("producer")
                .about("Publish demo messages to a queue")
                .arg(
                    Arg::with_name("dir")
                        .short("d")
                        .long("dir")
                        .value_name("DIR")
                        .help("Directory holding index.mm/data.mm/control.mm")
                        .default_value(".")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("count")
                        .short("c")
                        .long("count")
                        .value_name("COUNT")
                        .help("Number of messages to publish")
                        .default_value("1200")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("interval_ms")
                        .short("i")
                        .long("interval-ms")
                        .value_name("MS")
                        .help("Delay between publishes")
                        .default_value("50")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("max_consumers")
                        .long("max-consumers")
                        .value_name("N")
                        .help("Consumer slot table capacity")
                        .default_value("16")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("notify_sem")
                        .long("notify-sem")
                        .value_name("NAME")
                        .help("Name of the notify semaphore")
                        .default_value("/mmq-notify")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("registry_sem")
                        .long("registry-sem")
                        .value_name("NAME")
                        .help("Name of the registry-lock semaphore")
                        .default_value("/mmq-registry")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("consumer")
                .about("Drain messages from a queue")
                .arg(
                    Arg::with_name("name")
                        .value_name("NAME")
                        .help("Stable consumer name used for the registry slot")
                        .default_value("consumer1"),
                )
                .arg(
                    Arg::with_name("dir")
                        .short("d")
                        .long("dir")
                        .value_name("DIR")
                        .help("Directory holding index.mm/data.mm/control.mm")
                        .default_value(".")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("start_seq")
                        .short("s")
                        .long("start-seq")
                        .value_name("SEQ")
                        .help("First sequence number to read on a fresh slot")
                        .default_value("0")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("max")
                        .short("m")
                        .long("max")
                        .value_name("COUNT")
                        .help("Exit after this many messages (0 = run forever)")
                        .default_value("0")
                        .takes_value(true),
                ),
        )
        .get_matches();

    let code = match matches.subcommand() {
        ("producer", Some(sub)) => run_producer(sub),
        ("consumer", Some(sub)) => run_consumer(sub),
        _ => {
            println!("Use --help for usage information");
            0
        }
    };
    process::exit(code);
}

fn parse<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str) -> T
where
    T::Err: std::fmt::Display,
{
    let raw = matches.value_of(name).unwrap();
    match raw.parse() {
        Ok(v) => v,
        Err(err) => {
            eprintln!("invalid value for --{}: {}", name, err);
            process::exit(1);
        }
    }
}

fn run_producer(matches: &clap::ArgMatches) -> i32 {
    use std::io::Write;

    let dir = matches.value_of("dir").unwrap();
    let count: u64 = parse(matches, "count");
    let interval_ms: u64 = parse(matches, "interval_ms");
    let max_consumers: u32 = parse(matches, "max_consumers");
    let notify_sem = matches.value_of("notify_sem").unwrap();
    let registry_sem = matches.value_of("registry_sem").unwrap();

    let paths = QueuePaths::in_dir(Path::new(dir));
    let config = QueueConfig {
        max_consumers,
        ..Default::default()
    };

    println!(
        "initializing producer in {} (notify={}, registry={})",
        dir, notify_sem, registry_sem
    );

    let mut producer = match Producer::create(&config, &paths, notify_sem, registry_sem) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("producer: init failed ({}): {}", error_str(err.code()), err);
            return 1;
        }
    };

    println!("producing {} messages...", count);
    for i in 0..count {
        let msg = format!("msg {} (pid={})", i, process::id());
        if let Err(err) = producer.publish(msg.as_bytes()) {
            eprintln!(
                "producer: publish failed ({}): {}",
                error_str(err.code()),
                err
            );
            return 1;
        }
        print!("\rproduced {} messages...", i + 1);
        let _ = std::io::stdout().flush();

        if interval_ms > 0 {
            thread::sleep(Duration::from_millis(interval_ms));
        }
    }

    println!("\ndone producing messages.");
    producer.close();
    0
}

fn run_consumer(matches: &clap::ArgMatches) -> i32 {
    let name = matches.value_of("name").unwrap();
    let dir = matches.value_of("dir").unwrap();
    let start_seq: u64 = parse(matches, "start_seq");
    let max: u64 = parse(matches, "max");

    let paths = QueuePaths::in_dir(Path::new(dir));

    println!(
        "attaching consumer '{}' with start_seq={} in {}",
        name, start_seq, dir
    );

    let mut consumer = match Consumer::attach(&paths) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("consumer: attach failed ({}): {}", error_str(err.code()), err);
            return 1;
        }
    };

    let slot = match consumer.register(name, start_seq) {
        Ok(slot) => slot,
        Err(err) => {
            eprintln!(
                "consumer: register failed ({}): {}",
                error_str(err.code()),
                err
            );
            return 1;
        }
    };

    println!("consuming on slot {}...", slot);
    let mut received: u64 = 0;
    loop {
        match consumer.drain(slot) {
            Ok(Some(msg)) => {
                println!(
                    "consumer '{}' got seq {}: {}",
                    name,
                    msg.seq(),
                    String::from_utf8_lossy(msg.bytes())
                );
                received += 1;
                if max > 0 && received >= max {
                    println!("done after {} messages.", received);
                    return 0;
                }
            }
            Ok(None) => {
                if let Err(err) = consumer.wait_for_new() {
                    eprintln!("consumer: wait failed ({}): {}", error_str(err.code()), err);
                    return 1;
                }
            }
            Err(err) => {
                eprintln!("consumer: drain failed ({}): {}", error_str(err.code()), err);
                return 1;
            }
        }
    }
}
