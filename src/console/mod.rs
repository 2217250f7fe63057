//! Interactive console.
//!
//! Cache commands are published on the event hub rather than called on the
//! cache, so the console only ever talks to the hub for them. `keys` and
//! `namespaces` read the console's own cache instance.

mod command;

use std::io::{BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

pub use command::{Command, CommandError, HELP, parse_command, parse_value};

use crate::cache::{Cache, CacheOptions};
use crate::config::Config;
use crate::events::{self, CacheCommand, EventHandler, SubscriptionId, handler};

/// Line-oriented front end over an event hub.
pub struct Console {
    hub: Arc<dyn EventHandler>,
    cache: Cache,
    namespace: String,
    echo_responses: bool,
    responses: Arc<Mutex<Vec<Option<Value>>>>,
    response_subscription: SubscriptionId,
}

impl Console {
    /// Build a console with a cache on `hub`, configured from `config`.
    pub fn new(config: &Config, hub: Arc<dyn EventHandler>) -> Self {
        let cache = Cache::new(
            CacheOptions::default()
                .storage_type(config.storage_type)
                .event_handler(Arc::clone(&hub)),
        );
        Self::with_cache(config, hub, cache)
    }

    /// Build a console around an existing cache.
    pub fn with_cache(config: &Config, hub: Arc<dyn EventHandler>, cache: Cache) -> Self {
        let responses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&responses);
        let response_subscription = hub.subscribe(
            events::RESPONSE,
            handler(move |args| sink.lock().push(args.first().cloned())),
        );

        Self {
            hub,
            cache,
            namespace: config.default_namespace.clone(),
            echo_responses: config.echo_responses,
            responses,
            response_subscription,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Namespace used by commands that don't name one.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read commands from `input` until EOF or `quit`.
    pub fn run<R, W>(&mut self, input: R, output: &mut W) -> anyhow::Result<()>
    where
        R: BufRead,
        W: Write,
    {
        info!("Console ready ({} storage)", self.cache.storage_type());

        for line in input.lines() {
            let line = line?;
            match parse_command(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(command, output)?,
                Ok(None) => {}
                Err(e) => writeln!(output, "error: {e}")?,
            }
        }

        output.flush()?;
        Ok(())
    }

    /// Run one command, writing its result to `output`.
    pub fn execute<W: Write>(&mut self, command: Command, output: &mut W) -> anyhow::Result<()> {
        match command {
            Command::Cache(cache_command) => {
                let cache_command = self.with_default_namespace(cache_command);
                debug!("Publishing {:?}", cache_command);
                cache_command.publish(self.hub.as_ref());
                self.write_responses(&cache_command, output)?;
            }
            Command::Keys { namespace } => {
                let namespace = namespace.unwrap_or_else(|| self.namespace.clone());
                for key in self.cache.keys(Some(namespace.as_str())) {
                    let marker = if self.cache.store().get(&namespace, &key).is_some() {
                        ""
                    } else {
                        " (removed)"
                    };
                    writeln!(output, "{key}{marker}")?;
                }
            }
            Command::Namespaces => {
                for namespace in self.cache.namespaces() {
                    let current = if namespace == self.namespace { " *" } else { "" };
                    writeln!(output, "{namespace}{current}")?;
                }
            }
            Command::Use(namespace) => {
                writeln!(output, "using namespace '{namespace}'")?;
                self.namespace = namespace;
            }
            Command::Help => writeln!(output, "{HELP}")?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn with_default_namespace(&self, command: CacheCommand) -> CacheCommand {
        let current = Some(self.namespace.clone());
        match command {
            CacheCommand::Create { namespace } => CacheCommand::Create {
                namespace: namespace.or(current),
            },
            CacheCommand::Add {
                key,
                value,
                namespace,
            } => CacheCommand::Add {
                key,
                value,
                namespace: namespace.or(current),
            },
            CacheCommand::Get { key, namespace } => CacheCommand::Get {
                key,
                namespace: namespace.or(current),
            },
            CacheCommand::Remove { key, namespace } => CacheCommand::Remove {
                key,
                namespace: namespace.or(current),
            },
            CacheCommand::Clear { namespace } => CacheCommand::Clear {
                namespace: namespace.or(current),
            },
        }
    }

    fn write_responses<W: Write>(
        &self,
        command: &CacheCommand,
        output: &mut W,
    ) -> anyhow::Result<()> {
        let responses = std::mem::take(&mut *self.responses.lock());

        if !self.echo_responses {
            if !matches!(command, CacheCommand::Get { .. }) {
                writeln!(output, "ok")?;
            }
            return Ok(());
        }

        if responses.is_empty() {
            writeln!(output, "ok")?;
        }
        for response in responses {
            match response {
                Some(value) => writeln!(output, "-> {value}")?,
                None => writeln!(output, "-> (none)")?,
            }
        }
        Ok(())
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.hub.unsubscribe(events::RESPONSE, self.response_subscription);
    }
}
