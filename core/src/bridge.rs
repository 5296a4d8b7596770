//! JSON-lines bridge to an external microsimulation engine process.
//!
//! Protocol (one JSON object per line):
//!   -> {"type":"compute","id":"<session>:<seq>","source":{..},"variable":"..","period":2026,"reform":null|{..}}
//!   <- {"id":"<session>:<seq>","values":[..]}
//!   <- {"id":"<session>:<seq>","error":".."}
//!   -> {"type":"quit"}
//!
//! Calls block until the reply line arrives. No timeout, no retry.

use crate::{
    engine::{DataSource, Scenario, SimulationEngine},
    error::{AnalysisError, AnalysisResult},
    reform::Reform,
    types::Year,
};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use uuid::Uuid;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    Compute {
        id:       &'a str,
        source:   &'a DataSource,
        variable: &'a str,
        period:   Year,
        reform:   Option<&'a Reform>,
    },
    Quit,
}

#[derive(Deserialize)]
struct BridgeReply {
    id:     String,
    #[serde(default)]
    values: Option<Vec<f64>>,
    #[serde(default)]
    error:  Option<String>,
}

pub struct BridgeEngine<W: Write = ChildStdin, R: BufRead = BufReader<ChildStdout>> {
    /// None once the engine's input has been closed.
    writer:   Option<W>,
    reader:   R,
    session:  Uuid,
    next_seq: u64,
    child:    Option<Child>,
}

impl BridgeEngine {
    /// Start the engine process. `command[0]` is the program, the rest its args.
    pub fn spawn(command: &[String]) -> AnalysisResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| AnalysisError::Config("engine command is empty".into()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| AnalysisError::Bridge(format!("cannot start '{program}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnalysisError::Bridge("engine stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::Bridge("engine stdout unavailable".into()))?;

        log::info!("Engine bridge started: {}", command.join(" "));

        let mut engine = BridgeEngine::from_streams(stdin, BufReader::new(stdout), Uuid::new_v4());
        engine.child = Some(child);
        Ok(engine)
    }
}

impl<W: Write, R: BufRead> BridgeEngine<W, R> {
    /// Speak the protocol over arbitrary streams. Request ids are
    /// `<session>:<seq>` with seq starting at 1.
    pub fn from_streams(writer: W, reader: R, session: Uuid) -> Self {
        Self {
            writer: Some(writer),
            reader,
            session,
            next_seq: 1,
            child: None,
        }
    }

    fn send(&mut self, request: &BridgeRequest<'_>) -> AnalysisResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| AnalysisError::Bridge("engine input already closed".into()))?;
        let line = serde_json::to_string(request)?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> AnalysisResult<BridgeReply> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line)?;
        if bytes_read == 0 {
            return Err(AnalysisError::Bridge("engine closed its output".into()));
        }
        serde_json::from_str(line.trim_end())
            .map_err(|e| AnalysisError::Bridge(format!("malformed reply: {e}")))
    }
}

impl<W: Write, R: BufRead> SimulationEngine for BridgeEngine<W, R> {
    fn compute(
        &mut self,
        source: &DataSource,
        variable: &str,
        period: Year,
        scenario: Scenario<'_>,
    ) -> AnalysisResult<Vec<f64>> {
        let id = format!("{}:{}", self.session, self.next_seq);
        self.next_seq += 1;

        log::debug!("bridge request {id}: {variable} {period} [{}]", scenario.key());
        self.send(&BridgeRequest::Compute {
            id: &id,
            source,
            variable,
            period,
            reform: scenario.reform(),
        })?;

        let reply = self.receive()?;
        if reply.id != id {
            return Err(AnalysisError::Bridge(format!(
                "reply id mismatch: expected {id}, got {}",
                reply.id
            )));
        }
        match (reply.values, reply.error) {
            (_, Some(message)) => Err(AnalysisError::Engine {
                variable: variable.to_string(),
                message,
            }),
            (Some(values), None) => Ok(values),
            (None, None) => Err(AnalysisError::Bridge(format!(
                "reply {id} carries neither values nor error"
            ))),
        }
    }
}

impl<W: Write, R: BufRead> Drop for BridgeEngine<W, R> {
    fn drop(&mut self) {
        let _ = self.send(&BridgeRequest::Quit);
        // Close stdin so an engine that stops on EOF can exit.
        drop(self.writer.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
    }
}
