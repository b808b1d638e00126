use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, Sender};
use rhex_core::{Demographics, ResponseForm};
use rhex_experiment::{ResponseCollector, ResponseHandle};
use std::io::{self, BufRead, Write};
use std::thread;

/// Questionnaires answered on the researcher's terminal.
///
/// Requests are queued to a reader thread, so `show` returns at once and the
/// display keeps running while the participant answers.
pub struct ConsoleCollector {
    requests: Sender<ResponseHandle>,
}

impl ConsoleCollector {
    pub fn spawn() -> Result<Self> {
        let (requests, queue) = unbounded::<ResponseHandle>();
        thread::Builder::new()
            .name("console".into())
            .spawn(move || {
                let stdin = io::stdin();
                let mut input = stdin.lock();
                let mut out = io::stdout();
                for handle in queue {
                    match answer(handle, &mut input, &mut out) {
                        Ok(true) => {}
                        Ok(false) => {
                            log::error!("stdin closed; questionnaires can no longer be answered");
                            break;
                        }
                        Err(e) => {
                            log::error!("console: {e}");
                            break;
                        }
                    }
                }
            })
            .context("spawning console thread")?;
        Ok(Self { requests })
    }
}

impl ResponseCollector for ConsoleCollector {
    fn show(&mut self, handle: ResponseHandle) {
        if self.requests.send(handle).is_err() {
            log::error!("console reader is gone; form dropped");
        }
    }
}

fn prompt(form: ResponseForm) -> &'static str {
    match form {
        ResponseForm::Threshold => {
            "Threshold form: synchrony (0/1), ownership (0-1), pleasantness (0-1), comma separated"
        }
        ResponseForm::Long => "Long form: Q1..Q9, nine values between 0 and 1, comma separated",
    }
}

/// Normalises one answer line to the stored `a,b,c` form: the synchrony
/// answer as 0 or 1, slider values with two decimals.
pub fn parse_answers(form: ResponseForm, line: &str) -> Result<String, String> {
    let values: Vec<&str> = line
        .split([',', ' ', '\t'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    let expected = match form {
        ResponseForm::Threshold => 3,
        ResponseForm::Long => 9,
    };
    if values.len() != expected {
        return Err(format!("expected {expected} values, got {}", values.len()));
    }

    let mut out = Vec::with_capacity(expected);
    for (i, raw) in values.iter().enumerate() {
        let value: f32 = raw
            .parse()
            .map_err(|_| format!("value {} ({raw}) is not a number", i + 1))?;
        if form == ResponseForm::Threshold && i == 0 {
            if value != 0.0 && value != 1.0 {
                return Err(format!("synchrony must be 0 or 1, got {raw}"));
            }
            out.push(format!("{}", value as u8));
        } else {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("value {} ({raw}) is outside 0-1", i + 1));
            }
            out.push(format!("{value:.2}"));
        }
    }
    Ok(out.join(","))
}

/// Reads until a valid line arrives. Returns false on end of input, which
/// drops the handle unanswered.
fn answer(handle: ResponseHandle, input: &mut impl BufRead, out: &mut impl Write) -> io::Result<bool> {
    loop {
        writeln!(out, "{}", prompt(handle.form()))?;
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match parse_answers(handle.form(), &line) {
            Ok(answers) => {
                if !handle.submit(answers) {
                    log::warn!("answer arrived after the session ended");
                }
                return Ok(true);
            }
            Err(msg) => writeln!(out, "  {msg}, try again")?,
        }
    }
}

fn ask(input: &mut impl BufRead, out: &mut impl Write, question: &str) -> Result<String> {
    write!(out, "{question}: ")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed while asking for {question}");
    }
    Ok(line.trim().to_owned())
}

fn ask_number(input: &mut impl BufRead, out: &mut impl Write, question: &str) -> Result<u32> {
    loop {
        let answer = ask(input, out, question)?;
        if answer.is_empty() {
            return Ok(0);
        }
        match answer.parse() {
            Ok(n) => return Ok(n),
            Err(_) => writeln!(out, "  please enter a whole number")?,
        }
    }
}

fn ask_text(input: &mut impl BufRead, out: &mut impl Write, question: &str) -> Result<String> {
    let answer = ask(input, out, question)?;
    Ok(if answer.is_empty() { "NA".into() } else { answer })
}

/// Collects the demographics row before the session opens. Blank answers are
/// stored as `NA` (text) or 0 (numbers).
pub fn prompt_demographics(input: &mut impl BufRead, out: &mut impl Write) -> Result<Demographics> {
    writeln!(out, "Participant demographics (leave blank to skip)")?;
    Ok(Demographics {
        age: ask_number(input, out, "Age")?,
        years_education: ask_number(input, out, "Years of education")?,
        gender: ask_text(input, out, "Gender")?,
        handedness: ask_text(input, out, "Handedness")?,
        ethnicity: ask_text(input, out, "Ethnicity")?,
        alcohol_freq: ask_text(input, out, "Alcohol use frequency")?,
        cannabis_freq: ask_text(input, out, "Cannabis use frequency")?,
    })
}
