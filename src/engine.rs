//! Engine Module
//!
//! Runs client commands against the execution environment.
//!
//! ## Responsibilities
//! - Recover the environment from disk on startup
//! - Serialize every command through one worker thread
//! - Map commands onto database operations
//!
//! ## Concurrency Model: Single Worker Queue
//!
//! Any number of threads may call [`Engine::execute`]. Commands are queued on
//! a channel and applied one at a time by the worker, so one operation
//! completes before the next begins. The storage layer itself holds no
//! locks; the per-database mutex in the environment only guards access from
//! outside the engine.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::env::{DatabaseHandle, ExecutionEnvironment};
use crate::error::{Entity, KvsError, Result};
use crate::protocol::Command;
use crate::recovery::RecoveryReport;

/// Reply to a single command
pub type CommandReply = Result<Option<Vec<u8>>>;

struct Job {
    command: Command,
    reply: Sender<CommandReply>,
}

/// The command execution engine
pub struct Engine {
    env: Arc<ExecutionEnvironment>,

    /// Queue into the worker, `None` once shut down
    queue: Mutex<Option<Sender<Job>>>,

    worker: Mutex<Option<JoinHandle<()>>>,

    recovery: RecoveryReport,
}

impl Engine {
    /// Recover the working directory described by `config` and start the
    /// worker.
    ///
    /// Fails if any database, table or segment cannot be recovered.
    pub fn open(config: &Config) -> Result<Self> {
        let (env, recovery) = ExecutionEnvironment::initialize(config)?;
        Self::with_environment(Arc::new(env), recovery)
    }

    /// Start a worker over an already populated environment
    pub fn with_environment(env: Arc<ExecutionEnvironment>, recovery: RecoveryReport) -> Result<Self> {
        let (tx, rx) = channel::unbounded::<Job>();

        let worker_env = Arc::clone(&env);
        let worker = thread::Builder::new()
            .name("segmentkv-worker".to_string())
            .spawn(move || run_worker(worker_env, rx))
            .map_err(|e| KvsError::io(env.working_path(), e))?;

        Ok(Self {
            env,
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            recovery,
        })
    }

    /// Queue a command; the returned receiver yields its reply.
    pub fn submit(&self, command: Command) -> Result<Receiver<CommandReply>> {
        let (reply, rx) = channel::bounded(1);

        let queue = self.queue.lock();
        let sender = queue.as_ref().ok_or(KvsError::ServerClosed)?;
        sender
            .send(Job { command, reply })
            .map_err(|_| KvsError::ServerClosed)?;

        Ok(rx)
    }

    /// Queue a command and wait for its reply
    pub fn execute(&self, command: Command) -> CommandReply {
        self.submit(command)?
            .recv()
            .map_err(|_| KvsError::ServerClosed)?
    }

    /// Stop accepting commands, let queued ones finish, join the worker.
    pub fn shutdown(&self) {
        drop(self.queue.lock().take());

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("Engine worker panicked");
            }
        }
    }

    pub fn env(&self) -> &Arc<ExecutionEnvironment> {
        &self.env
    }

    /// What was replayed at startup
    pub fn recovery_report(&self) -> RecoveryReport {
        self.recovery
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(env: Arc<ExecutionEnvironment>, jobs: Receiver<Job>) {
    for job in jobs {
        tracing::trace!("Executing {:?}", job.command.command_type());
        let result = execute_command(&env, job.command);
        // The caller may have given up waiting
        let _ = job.reply.send(result);
    }
    tracing::debug!("Engine worker stopped");
}

/// Apply one command to the environment.
///
/// - CREATE_DATABASE / CREATE_TABLE reply with a confirmation message
/// - SET replies with the previous value, if any
/// - GET replies with the current value, if any
/// - DELETE replies with the deleted value; deleting a missing key fails
pub fn execute_command(env: &ExecutionEnvironment, command: Command) -> CommandReply {
    match command {
        Command::CreateDatabase { database } => {
            env.create_database(&database)?;
            Ok(Some(format!("Database {} created successfully", database).into_bytes()))
        }
        Command::CreateTable { database, table } => {
            let handle = lookup(env, &database)?;
            handle.lock().create_table_if_not_exists(&table)?;
            Ok(Some(format!("Table {} created successfully", table).into_bytes()))
        }
        Command::Set {
            database,
            table,
            key,
            value,
        } => {
            let handle = lookup(env, &database)?;
            let mut db = handle.lock();
            let previous = db.read(&table, &key)?;
            db.write(&table, &key, &value)?;
            Ok(previous)
        }
        Command::Get { database, table, key } => {
            let handle = lookup(env, &database)?;
            let value = handle.lock().read(&table, &key)?;
            Ok(value)
        }
        Command::Delete { database, table, key } => {
            let handle = lookup(env, &database)?;
            let mut db = handle.lock();
            match db.read(&table, &key)? {
                Some(previous) => {
                    db.delete(&table, &key)?;
                    Ok(Some(previous))
                }
                None => Err(KvsError::not_found(
                    Entity::Key,
                    String::from_utf8_lossy(&key).into_owned(),
                )),
            }
        }
    }
}

fn lookup(env: &ExecutionEnvironment, database: &str) -> Result<DatabaseHandle> {
    env.get_database(database)
        .ok_or_else(|| KvsError::not_found(Entity::Database, database))
}
