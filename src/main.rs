/*!
An OpenFlow gateway that exposes the statistics of the connected switches
and the mutation of their flow, meter and group tables via REST.

The gateway speaks OpenFlow 1.0, 1.2 and 1.3 and supports any number of
switches. You can use mininet as a test switch.
To spawn an instance with 4 ports you can run:

```sh
# mn --controller remote,port=6653 --topo single,4 --switch ovs,protocols=OpenFlow13
```

and then query it:

```sh
$ curl http://127.0.0.1:8080/stats/switches
$ curl http://127.0.0.1:8080/stats/flow/1
```
*/

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate simple_logger;

#[cfg(unix)]
extern crate libc;
#[cfg(unix)]
extern crate log_panics;
#[cfg(unix)]
extern crate syslog;

mod conf;
mod correlator;
mod gateway;
mod ofctl;
mod openflow;
mod request;
mod rest;
mod waiters;

use correlator::ReplyCorrelator;
use gateway::StatsGateway;
use ofctl::Registry;
use openflow::Datapaths;
use waiters::Waiters;

#[cfg(unix)]
use std::fs::File;
use std::io;
#[cfg(unix)]
use std::io::prelude::*;
use std::net;
use std::process::exit;
use std::sync::Arc;
use std::thread;

fn init_logging(syslog: bool, log_lvl: log::Level) -> io::Result<()> {
    let init_failed = |e: String| {
        io::Error::new(io::ErrorKind::Other, format!("error on logging initialization: {}", e))
    };

    #[cfg(unix)]
    {
        if syslog {
            let app_name = Some(crate_name!());
            syslog::init(syslog::Facility::LOG_USER, log_lvl.to_level_filter(), app_name)
                .map_err(|e| init_failed(e.to_string()))?;
            log_panics::init();
            return Ok(());
        }
    }
    #[cfg(not(unix))]
    let _ = syslog;

    simple_logger::init_with_level(log_lvl).map_err(|e| init_failed(e.to_string()))
}

/// Forks and exits the parent process after writing the child's PID
#[cfg(unix)]
fn daemonize(pid_path: &str) -> io::Result<()> {
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    else if pid > 0 {
        let mut file = File::create(pid_path)?;
        write!(file, "{}", pid)?;
        // exit the parent process
        exit(0);
    }
    Ok(())
}

/// Reads command line arguments and calls the corresponding functions.
fn handle_cli_args() -> io::Result<()> {
    #[cfg(unix)]
    let unix_opts =
        "-p, --pid [file] 'Daemonizes the process and writes a PID file'
        -s, --syslog      'Logs via syslog'
        ";
    #[cfg(not(unix))]
    let unix_opts = "";

    let usage = &format!(
        "{}-v...          'Repeat to set the level of verbosity'
        -c, --conf [ini]  'The INI configuration file'",
        unix_opts
    );
    let matches = app_from_crate!().args_from_usage(usage).get_matches();

    let log_lvl = match matches.occurrences_of("v") {
        0 => log::Level::Error,
        1 => log::Level::Warn,
        2 => log::Level::Info,
        3 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    init_logging(matches.is_present("syslog"), log_lvl)?;

    let config = match matches.value_of("conf") {
        Some(path) => conf::parse_file(path)?,
        None => conf::Config::default(),
    };

    #[cfg(unix)]
    {
        if let Some(pid_path) = matches.value_of("pid") {
            daemonize(pid_path)?;
        }
    }

    let listener = net::TcpListener::bind(config.connection.socket)?;
    info!("Listening for switches on {}", listener.local_addr()?);

    let waiters = Arc::new(Waiters::new());
    let registry = Arc::new(Registry::new());
    let datapaths = Arc::new(Datapaths::new());
    let correlator = ReplyCorrelator::new(waiters.clone(), registry.clone());
    let gateway = StatsGateway::new(datapaths.clone(), waiters, registry, config.stats.timeout);

    thread::spawn(move || openflow::listen(listener, datapaths, correlator));
    rest::server::run(config.rest.listen, Arc::new(gateway))
}

/// Entry function with top level error handling.
fn main() {
    if let Err(e) = handle_cli_args() {
        error!("{}", e);
        exit(1);
    }
}
