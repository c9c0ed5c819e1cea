//! Headless session runner.
//!
//! [`Session`] turns protocol commands into simulation calls and
//! responses. [`HeadlessRunner`] wraps it in a blocking JSON-lines loop
//! over any reader and writer.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use lane_core::events::SimEvent;
use lane_core::simulation::Simulation;
use lane_core::state::Signal;

use crate::protocol::{Command, GameResult, Response};
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output a state snapshot after every tick command (vs only on query).
    pub auto_state_output: bool,
    /// Scenario to load on startup: a RON path or a built-in name.
    pub scenario_path: Option<String>,
}

/// One controlled simulation plus the event buffer feeding its responses.
pub struct Session {
    sim: Simulation,
    pending: Rc<RefCell<Vec<SimEvent>>>,
    auto_state_output: bool,
    announced_end: bool,
}

impl Session {
    /// Wrap a simulation, subscribing to its events.
    pub fn new(mut sim: Simulation, auto_state_output: bool) -> Self {
        let pending = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&pending);
        sim.subscribe(move |event: &SimEvent| sink.borrow_mut().push(*event));
        let announced_end = sim.state().is_terminal();
        Self {
            sim,
            pending,
            auto_state_output,
            announced_end,
        }
    }

    /// The wrapped simulation.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Greeting sent before the first command.
    #[must_use]
    pub fn ready(&self) -> Response {
        Response::ready(self.sim.get_tick(), self.sim.state())
    }

    /// Apply one command, returning the responses in output order.
    pub fn handle(&mut self, command: Command) -> Vec<Response> {
        let name = command.name();
        let mut responses = Vec::new();

        match command {
            Command::Tick { count } => {
                for _ in 0..count {
                    self.sim.tick();
                    if !self.sim.state().is_running() {
                        break;
                    }
                }
                responses.push(Response::Events {
                    tick: self.sim.get_tick(),
                    events: self.take_events(),
                });
                if self.auto_state_output {
                    responses.push(Response::state(&self.sim));
                }
            }
            Command::Place {
                unit_type,
                row,
                col,
            } => match self.sim.request_placement(&unit_type, row, col) {
                Ok(unit_id) => responses.push(Response::Placed {
                    unit_id,
                    unit_type,
                    row,
                    col,
                }),
                Err(e) => responses.push(Response::error(e.to_string(), Some(name))),
            },
            Command::Spawn { unit_type, lane } => {
                match self.sim.spawn_attacker(&unit_type, lane) {
                    Ok(unit_id) => responses.push(Response::Spawned {
                        unit_id,
                        unit_type,
                        lane,
                    }),
                    Err(e) => responses.push(Response::error(e.to_string(), Some(name))),
                }
            }
            Command::Heal { unit_id, amount } => match self.sim.heal_unit(unit_id, amount) {
                Ok(healed) => responses.push(Response::Healed { unit_id, healed }),
                Err(e) => responses.push(Response::error(e.to_string(), Some(name))),
            },
            Command::Start => responses.push(self.signal(Signal::Start, name)),
            Command::Pause => responses.push(self.signal(Signal::Pause, name)),
            Command::Resume => responses.push(self.signal(Signal::Resume, name)),
            Command::Restart => {
                let response = self.signal(Signal::Restart, name);
                if matches!(response, Response::Ack { .. }) {
                    self.announced_end = false;
                }
                responses.push(response);
            }
            Command::Win => match self.sim.declare_victory() {
                Ok(_) => responses.push(Response::ack(name)),
                Err(e) => responses.push(Response::error(e.to_string(), Some(name))),
            },
            Command::Query => responses.push(Response::state(&self.sim)),
            Command::Hash => responses.push(Response::Hash {
                tick: self.sim.get_tick(),
                hash: self.sim.state_hash(),
            }),
            Command::Quit => responses.push(Response::Bye),
        }

        let events = self.take_events();
        if !events.is_empty() {
            responses.push(Response::Events {
                tick: self.sim.get_tick(),
                events,
            });
        }
        if let Some(over) = self.check_game_over() {
            responses.push(over);
        }
        responses
    }

    fn signal(&mut self, signal: Signal, name: &str) -> Response {
        match self.sim.request_state_transition(signal) {
            Ok(_) => Response::ack(name),
            Err(e) => Response::error(e.to_string(), Some(name)),
        }
    }

    fn take_events(&self) -> Vec<SimEvent> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    fn check_game_over(&mut self) -> Option<Response> {
        if self.announced_end {
            return None;
        }
        let result = GameResult::from_state(self.sim.state())?;
        self.announced_end = true;
        tracing::info!(?result, tick = self.sim.get_tick(), "Session ended");
        Some(Response::GameOver {
            result,
            tick: self.sim.get_tick(),
        })
    }
}

/// Headless runner for scripted play.
#[derive(Debug, Default)]
pub struct HeadlessRunner {
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Create a new headless runner with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner with custom configuration.
    #[must_use]
    pub fn with_config(config: HeadlessConfig) -> Self {
        Self { config }
    }

    /// Build the session this runner will drive.
    pub fn build_session(&self) -> Result<Session, ScenarioError> {
        let scenario = match &self.config.scenario_path {
            Some(path) => Scenario::resolve(path)?,
            None => Scenario::default(),
        };
        tracing::info!(scenario = %scenario.name, "Loading scenario");
        let sim = scenario.build_simulation()?;
        Ok(Session::new(sim, self.config.auto_state_output))
    }

    /// Run on stdin/stdout until `quit` or end of input.
    pub fn run(self) -> Result<(), RunnerError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock())
    }

    /// Run over arbitrary streams until `quit` or end of input.
    pub fn run_with<R: BufRead, W: Write>(
        self,
        input: R,
        mut output: W,
    ) -> Result<(), RunnerError> {
        let mut session = self.build_session()?;
        write_response(&mut output, &session.ready())?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let command = match Command::from_json(line) {
                Ok(command) => command,
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable command");
                    let error = Response::error(format!("Parse error: {e}"), None);
                    write_response(&mut output, &error)?;
                    continue;
                }
            };
            tracing::debug!(cmd = command.name(), "Command");

            let quit = command == Command::Quit;
            for response in session.handle(command) {
                write_response(&mut output, &response)?;
            }
            if quit {
                break;
            }
        }

        tracing::info!(
            tick = session.simulation().get_tick(),
            hash = session.simulation().state_hash(),
            "Runner finished"
        );
        Ok(())
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

/// Errors that stop the runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Scenario could not be loaded.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// Reading commands or writing responses failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
