//! `session`: line-oriented operator commands against the simulated sensor.
//!
//! Blank lines and lines starting with `#` are skipped. Every command prints
//! one line of text, or one JSON object in JSON mode.

use std::io::BufRead;

use capscale_core::config::average_count_from;
use capscale_core::{
    CalibrationEngine, CalibrationModel, Criterion, FeatureMode, ModelFamily, ReferenceModel,
    SampleScope,
};
use capscale_hardware::{SensorModel, SimulatedSensor};
use capscale_traits::RawReadingSource;
use eyre::{WrapErr, bail};
use serde_json::{Value, json};

use crate::report;

pub fn sensor_from_config(cfg: &capscale_config::Config) -> SimulatedSensor {
    SimulatedSensor::new(SensorModel {
        a: cfg.reference.a,
        b: cfg.reference.b,
        c0: cfg.reference.c0,
        zero_counts: cfg.sensor.zero_counts,
        counts_per_pf: cfg.sensor.counts_per_pf,
        noise_counts: cfg.sensor.noise_counts,
        seed: cfg.sensor.seed,
    })
}

/// What a command asked the loop to do next.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue(Value),
    Quit,
}

pub struct Session {
    pub engine: CalibrationEngine,
    pub sensor: SimulatedSensor,
    json: bool,
}

impl Session {
    pub fn new(cfg: &capscale_config::Config, json: bool) -> eyre::Result<Self> {
        let engine = CalibrationEngine::builder()
            .with_config(cfg.into())
            .try_build()?;
        Ok(Self {
            engine,
            sensor: sensor_from_config(cfg),
            json,
        })
    }

    /// Run commands until EOF or `quit`.
    pub fn run<R: BufRead>(&mut self, input: R) -> eyre::Result<()> {
        for (idx, line) in input.lines().enumerate() {
            let line = line.wrap_err("read session input")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match self
                .execute(line)
                .wrap_err_with(|| format!("line {}: '{line}'", idx + 1))?
            {
                Flow::Continue(out) => self.emit(&out),
                Flow::Quit => break,
            }
        }
        Ok(())
    }

    fn emit(&self, out: &Value) {
        if self.json {
            println!("{out}");
        } else if let Some(text) = out.get("text").and_then(Value::as_str) {
            println!("{text}");
        }
    }

    /// Execute one command line.
    pub fn execute(&mut self, line: &str) -> eyre::Result<Flow> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let out = match (cmd, args.as_slice()) {
            ("quit" | "exit", []) => return Ok(Flow::Quit),
            ("place", [grams]) => {
                let g: f64 = parse(grams, "grams")?;
                self.sensor.place(g);
                json!({ "event": "place", "weight_g": g, "text": format!("placed {g} g") })
            }
            ("tare", []) => {
                let tare = self.engine.tare(&mut self.sensor)?;
                json!({ "event": "tare", "tare_counts": tare, "text": format!("tare: {tare} counts") })
            }
            ("add", [grams]) => {
                let g: f64 = parse(grams, "grams")?;
                match self.engine.measure_and_add(&mut self.sensor, g)? {
                    Some(id) => {
                        let model = self.engine.advisory_model();
                        json!({
                            "event": "add",
                            "id": id,
                            "model": report::model_json(model)?,
                            "text": format!("sample #{id} added\n{}", report::model_text(model)),
                        })
                    }
                    None => json!({ "event": "add", "id": Value::Null, "text": "ignored: weight must be finite and >= 0" }),
                }
            }
            ("apply", []) => {
                let applied = self.engine.apply_recommended_model();
                let text = if applied {
                    self.engine
                        .runtime_model()
                        .map_or_else(String::new, |m| format!("applied {}", m.label()))
                } else {
                    "nothing to apply".to_string()
                };
                json!({ "event": "apply", "applied": applied, "text": text })
            }
            ("reset", []) => {
                self.engine.reset_all_samples();
                json!({ "event": "reset", "text": "samples cleared" })
            }
            ("read", []) => {
                let count = self.engine.config().acquisition.average_count;
                let reading = self
                    .sensor
                    .averaged_reading(count)
                    .map_err(|e| eyre::eyre!("sensor read failed: {e}"))?;
                let live = self.engine.live_reading(reading.primary);
                let mut v = report::live_json(&live)?;
                v["event"] = json!("read");
                v["text"] = json!(report::live_text(&live));
                v
            }
            ("show", []) => {
                let rows = self.engine.sample_rows();
                let model = self.engine.advisory_model();
                let runtime = self.engine.runtime_model();
                let mut text = report::model_text(model);
                text.push_str(&format!(
                    "\nruntime: {}",
                    runtime.map_or_else(|| "fallback".to_string(), CalibrationModel::label)
                ));
                if !rows.is_empty() {
                    text.push('\n');
                    text.push_str(&report::rows_text(&rows));
                }
                json!({
                    "event": "show",
                    "model": report::model_json(model)?,
                    "runtime": report::model_json(runtime)?,
                    "rows": report::rows_json(&rows)?,
                    "overlay": self.engine.fit_overlay(),
                    "config": self.engine.config(),
                    "text": text,
                })
            }
            ("set", [key, value]) => {
                self.set(key, value)?;
                json!({ "event": "set", "key": key, "value": value, "text": format!("{key} = {value}") })
            }
            _ => bail!("unknown command '{line}'"),
        };
        Ok(Flow::Continue(out))
    }

    fn set(&mut self, key: &str, value: &str) -> eyre::Result<()> {
        let mut cfg = *self.engine.config();
        match key {
            "family" => cfg.fit.family = value.parse::<ModelFamily>()?,
            "criterion" => cfg.fit.criterion = value.parse::<Criterion>()?,
            "scope" => cfg.fit.scope = value.parse::<SampleScope>()?,
            "feature" => cfg.fit.feature = value.parse::<FeatureMode>()?,
            "inverse" => cfg.fit.inverse = parse_bool(value)?,
            "sigma" => cfg.fit.outlier_sigma = parse(value, key)?,
            "lambda" => cfg.fit.ridge_lambda = parse(value, key)?,
            "ref-delta" => cfg.fit.reference_delta_counts = parse(value, key)?,
            "avg" => cfg.acquisition.average_count = average_count_from(parse(value, key)?),
            "a" | "b" | "c0" => {
                let v: f64 = parse(value, key)?;
                let r = cfg.reference;
                cfg.reference = match key {
                    "a" => ReferenceModel::new(v, r.b, r.c0),
                    "b" => ReferenceModel::new(r.a, v, r.c0),
                    _ => ReferenceModel::new(r.a, r.b, v),
                };
            }
            "factor" | "offset" => {
                let v: f64 = parse(value, key)?;
                let fb = cfg.fallback;
                let (factor, offset) = if key == "factor" {
                    (v, fb.offset)
                } else {
                    (fb.factor, v)
                };
                self.engine.set_fallback(factor, offset);
                return Ok(());
            }
            _ => bail!("unknown setting '{key}'"),
        }
        self.engine.update_config(cfg);
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(raw: &str, what: &str) -> eyre::Result<T> {
    raw.parse::<T>()
        .map_err(|_| eyre::eyre!("invalid {what} '{raw}'"))
}

fn parse_bool(raw: &str) -> eyre::Result<bool> {
    match raw {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => bail!("invalid boolean '{raw}'"),
    }
}

pub fn run_session(cfg: &capscale_config::Config, script: Option<&std::path::Path>, json: bool) -> eyre::Result<()> {
    let mut session = Session::new(cfg, json)?;
    match script {
        Some(path) => {
            let file = std::fs::File::open(path)
                .wrap_err_with(|| format!("open session script {}", path.display()))?;
            session.run(std::io::BufReader::new(file))
        }
        None => session.run(std::io::stdin().lock()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&capscale_config::Config::default(), true).unwrap()
    }

    #[test]
    fn scripted_calibration_produces_a_model() {
        let mut s = session();
        for line in ["place 0", "tare", "place 100", "add 100", "place 200", "add 200"] {
            s.execute(line).unwrap();
        }
        assert_eq!(s.engine.samples().len(), 2);
        assert!(s.engine.advisory_model().is_some());
        assert_eq!(s.engine.tare_counts(), 1000);
        match s.execute("apply").unwrap() {
            Flow::Continue(v) => assert_eq!(v["applied"], json!(true)),
            Flow::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn set_updates_engine_config() {
        let mut s = session();
        s.execute("set family quadratic").unwrap();
        s.execute("set inverse on").unwrap();
        s.execute("set avg 0").unwrap();
        s.execute("set factor 0.002").unwrap();
        let cfg = s.engine.config();
        assert_eq!(cfg.fit.family, ModelFamily::Quadratic);
        assert!(cfg.fit.inverse);
        assert_eq!(cfg.acquisition.average_count, 1);
        assert_eq!(cfg.fallback.factor, 0.002);
        assert_eq!(cfg.fallback.offset, 0.0);
    }

    #[test]
    fn bad_commands_error() {
        let mut s = session();
        assert!(s.execute("frobnicate").is_err());
        assert!(s.execute("set family cubic").is_err());
        assert!(s.execute("place heavy").is_err());
        assert!(s.execute("set colour red").is_err());
        assert_eq!(s.execute("quit").unwrap(), Flow::Quit);
    }

    #[test]
    fn invalid_weight_is_ignored() {
        let mut s = session();
        match s.execute("add -5").unwrap() {
            Flow::Continue(v) => assert!(v["id"].is_null()),
            Flow::Quit => panic!("unexpected quit"),
        }
        assert!(s.engine.samples().is_empty());
    }
}
