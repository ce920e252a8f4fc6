use crate::core::render::Projection;
use crate::domain::model::{CurrencyCode, IdentityField, ItemId, UserEvent};
use crate::domain::ports::ViewSink;
use crate::utils::error::{Result, WizardError};
use std::io::Write;

pub const HELP: &str = "\
commands:
  name|email|phone <value>   edit an identity field
  next | back                move one step
  change-plan                jump back to the plan step
  confirm                    confirm from the summary step
  plan <id>                  select a plan
  addon <id>                 toggle an add-on
  billing monthly|yearly     change the billing cycle
  currency <code>            change the display currency
  refresh                    fetch exchange rates
  test-error                 request rates for an invalid base currency
  dismiss                    hide the current notice
  reset                      start the session over
  show | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(UserEvent),
    Show,
    Help,
    Quit,
}

/// Parses one console line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let event = match verb.to_ascii_lowercase().as_str() {
        "name" | "email" | "phone" => {
            UserEvent::EditField(verb.parse::<IdentityField>()?, rest.to_string())
        }
        "next" => UserEvent::Advance,
        "back" => UserEvent::Retreat,
        "change-plan" => UserEvent::JumpToPlanStep,
        "confirm" => UserEvent::Confirm,
        "plan" => UserEvent::SelectPlan(ItemId::new(require_arg(verb, rest, "a plan id")?)),
        "addon" => UserEvent::ToggleAddon(ItemId::new(require_arg(verb, rest, "an add-on id")?)),
        "billing" => UserEvent::ChangeBilling(require_arg(verb, rest, "a billing cycle")?.parse()?),
        "currency" => UserEvent::ChangeCurrency(CurrencyCode::new(
            require_arg(verb, rest, "a currency code")?.to_ascii_uppercase(),
        )),
        "refresh" => UserEvent::RequestRefresh,
        "test-error" => UserEvent::SimulateRateFailure,
        "dismiss" => UserEvent::DismissNotice,
        "reset" => UserEvent::Reset,
        "show" => return Ok(Some(Command::Show)),
        "help" => return Ok(Some(Command::Help)),
        "quit" | "exit" => return Ok(Some(Command::Quit)),
        other => {
            return Err(WizardError::ConfigError {
                message: format!("unknown command '{}'", other),
            })
        }
    };

    Ok(Some(Command::Event(event)))
}

fn require_arg<'a>(verb: &str, rest: &'a str, what: &str) -> Result<&'a str> {
    if rest.is_empty() {
        return Err(WizardError::ConfigError {
            message: format!("'{}' needs {}", verb, what),
        });
    }
    Ok(rest)
}

pub fn render_text(projection: &Projection) -> String {
    let mut lines = Vec::new();

    let current = projection
        .steps
        .iter()
        .find(|s| s.visible)
        .map(|s| s.title.as_str())
        .unwrap_or("?");
    if projection.step_indicator.visible {
        lines.push(format!("== {} | {} ==", projection.step_indicator.text, current));
    } else {
        lines.push(format!("== {} ==", current));
    }

    lines.push(format!("billing: {:?}", projection.billing.cycle));
    let currencies: Vec<String> = projection
        .currencies
        .iter()
        .map(|c| {
            let mark = if c.selected { "*" } else { "" };
            let off = if c.enabled { "" } else { " (unavailable)" };
            format!("{}{}{}", mark, c.code, off)
        })
        .collect();
    lines.push(format!("currency: {}", currencies.join(" ")));

    for plan in &projection.plans {
        let mark = if plan.selected { "[x]" } else { "[ ]" };
        let free = plan
            .free_period
            .as_deref()
            .map(|f| format!(" ({})", f))
            .unwrap_or_default();
        lines.push(format!("plan  {} {} {}{}", mark, plan.id, plan.price, free));
    }
    for addon in &projection.addons {
        let mark = if addon.selected { "[x]" } else { "[ ]" };
        lines.push(format!("addon {} {} {}", mark, addon.id, addon.price));
    }

    if let Some(summary) = &projection.summary {
        lines.push("-- summary --".to_string());
        lines.push(format!("{}: {}", summary.plan.label, summary.plan.price));
        for line in &summary.addons {
            lines.push(format!("  {}: {}", line.label, line.price));
        }
        lines.push(format!("{}: {}", summary.total.label, summary.total.price));
    }

    for error in &projection.field_errors {
        lines.push(format!("! {}: {}", error.field.as_str(), error.message));
    }
    if let Some(notice) = &projection.notice {
        lines.push(format!("! {}", notice));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Writes each projection as one JSON line.
pub struct JsonViewSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonViewSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_line(&mut self, projection: &Projection) -> Result<()> {
        let json = serde_json::to_string(projection)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> ViewSink for JsonViewSink<W> {
    fn present(&mut self, projection: &Projection) {
        if let Err(e) = self.write_line(projection) {
            tracing::warn!("Failed to write projection: {}", e);
        }
    }
}

/// Writes each projection in a readable block.
pub struct TextViewSink<W: Write> {
    writer: W,
}

impl<W: Write> TextViewSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ViewSink for TextViewSink<W> {
    fn present(&mut self, projection: &Projection) {
        if let Err(e) = write!(self.writer, "{}", render_text(projection)) {
            tracing::warn!("Failed to write projection: {}", e);
        }
    }
}
