//! Rendering of setup sequences.
//!
//! `cpp` renders C++-style statements for the firmware's setup function;
//! `json` dumps the sequences as data for other tooling.

use std::fmt::Write as _;
use std::str::FromStr;

use dpgen_common::value::Value;

use crate::collaborators::{CallbackHandle, PinHandle, PinMode};
use crate::sequencer::{SetupOp, SetupSequence};

/// Output format of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Cpp,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpp" | "c++" => Ok(Self::Cpp),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}', expected cpp or json")),
        }
    }
}

/// Render all sequences in the requested format.
pub fn render(sequences: &[SetupSequence], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Cpp => Ok(render_cpp_all(sequences)),
        OutputFormat::Json => serde_json::to_string_pretty(sequences),
    }
}

/// C++ literal for a constructor argument.
fn cpp_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        Value::Duration(d) => d.as_millis().to_string(),
        Value::Pin(pin) => pin.number.to_string(),
        other => other.to_string(),
    }
}

fn pin_decl(out: &mut String, pin: &PinHandle) {
    let _ = writeln!(
        out,
        "GPIOPin *{} = new_gpio_pin({}, {}, gpio::FLAG_{});",
        pin.var,
        pin.pin.number,
        pin.pin.inverted,
        match pin.mode {
            PinMode::Output => "OUTPUT",
            PinMode::Input => "INPUT",
        }
    );
}

fn lambda_decl(out: &mut String, callback: &CallbackHandle) {
    let params = callback
        .signature
        .params
        .iter()
        .map(|(ty, name)| format!("{ty}{name}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(
        out,
        "auto {} = [=]({params}) -> {} {{",
        callback.var, callback.signature.return_type
    );
    for line in callback.body.lines() {
        let _ = writeln!(out, "  {line}");
    }
    out.push_str("};\n");
}

/// Render one sequence as C++ statements.
pub fn render_cpp(sequence: &SetupSequence) -> String {
    let var = sequence.instance.as_str();
    let mut out = String::new();
    let _ = writeln!(out, "// {}: {}", sequence.platform, var);

    for op in &sequence.ops {
        match op {
            SetupOp::Construct { descriptor } => {
                let args = descriptor
                    .ctor_args
                    .iter()
                    .map(cpp_literal)
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(out, "auto *{var} = new {}({args});", descriptor.class);
            }
            SetupOp::RegisterPolling { polling } => {
                let _ = writeln!(
                    out,
                    "{var}->set_update_interval({});",
                    polling.interval.as_millis()
                );
                if let Some(priority) = polling.setup_priority {
                    let _ = writeln!(out, "{var}->set_setup_priority({priority:?}f);");
                }
                let _ = writeln!(out, "App.register_component({var});");
            }
            SetupOp::RegisterDisplay { settings } => {
                let _ = writeln!(
                    out,
                    "{var}->set_rotation(display::DISPLAY_ROTATION_{}_DEGREES);",
                    settings.rotation
                );
                let _ = writeln!(out, "{var}->set_auto_clear({});", settings.auto_clear);
                let _ = writeln!(out, "App.register_display({var});");
            }
            SetupOp::SetResetPin { pin } => {
                pin_decl(&mut out, pin);
                let _ = writeln!(out, "{var}->set_reset_pin({});", pin.var);
            }
            SetupOp::SetWriter { writer } => {
                lambda_decl(&mut out, writer);
                let _ = writeln!(out, "{var}->set_writer({});", writer.var);
            }
            SetupOp::SetPages { pages } => {
                for page in pages {
                    lambda_decl(&mut out, &page.callback);
                    let _ = writeln!(
                        out,
                        "auto *{} = new display::DisplayPage({});",
                        page.var, page.callback.var
                    );
                }
                let vars = pages
                    .iter()
                    .map(|p| p.var.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(out, "{var}->set_pages({{{vars}}});");
            }
            SetupOp::RegisterBus { binding } => {
                let _ = writeln!(out, "{var}->set_spi_parent({});", binding.bus_id);
                if let Some(cs) = &binding.cs_pin {
                    pin_decl(&mut out, cs);
                    let _ = writeln!(out, "{var}->set_cs_pin({});", cs.var);
                }
                let _ = writeln!(out, "{var}->set_data_rate({});", binding.data_rate_hz);
                let _ = writeln!(out, "{var}->set_mode(spi::MODE{});", binding.mode.index());
            }
            SetupOp::SetDcPin { pin } => {
                pin_decl(&mut out, pin);
                let _ = writeln!(out, "{var}->set_dc_pin({});", pin.var);
            }
        }
    }
    out
}

/// Render sequences separated by blank lines.
pub fn render_cpp_all(sequences: &[SetupSequence]) -> String {
    sequences
        .iter()
        .map(render_cpp)
        .collect::<Vec<_>>()
        .join("\n")
}
