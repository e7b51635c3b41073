//! Setup sequencer tests against recording collaborators.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use dpgen::collaborators::{
    BusBinding, BusRegistrar, CallbackCompiler, CallbackHandle, CallbackSignature, Collaborators,
    ComponentRegistrar, DisplayRegistrar, DisplaySettings, DisplayTable, PeripheralHandle,
    PinHandle, PinMode, PinResolver, PollingSettings, RegisterError, ResolveError, SpiDevice,
};
use dpgen::model::PeripheralDescriptor;
use dpgen::models::gc9106;
use dpgen::sequencer::{sequence, SetupOp, SetupSequence};
use dpgen::ids::IdAllocator;
use dpgen::GenError;
use dpgen_common::pin::PinRef;
use dpgen_common::validate::{RawConfig, ValidatedConfig};
use dpgen_common::value::Value;

type Log = Rc<RefCell<Vec<String>>>;

// ─── Recording fakes ────────────────────────────────────────────────

struct Components(Log);

impl ComponentRegistrar for Components {
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        polling: &PollingSettings,
    ) -> Result<(), RegisterError> {
        self.0.borrow_mut().push(format!(
            "component {handle} {}ms",
            polling.interval.as_millis()
        ));
        Ok(())
    }
}

struct Displays(Log);

impl DisplayRegistrar for Displays {
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        settings: &DisplaySettings,
    ) -> Result<(), RegisterError> {
        self.0.borrow_mut().push(format!(
            "display {handle} {}x{}",
            settings.width, settings.height
        ));
        Ok(())
    }
}

struct Buses(Log);

impl BusRegistrar for Buses {
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        device: &SpiDevice,
    ) -> Result<BusBinding, RegisterError> {
        self.0
            .borrow_mut()
            .push(format!("bus {handle} {}", device.data_rate_hz));
        Ok(BusBinding {
            bus_id: "spi_bus".into(),
            cs_pin: device.cs_pin.clone(),
            data_rate_hz: device.data_rate_hz,
            mode: device.mode,
        })
    }
}

struct Pins {
    log: Log,
    fail_on: Option<&'static str>,
}

impl PinResolver for Pins {
    fn resolve(
        &mut self,
        _owner: &PeripheralHandle,
        key: &str,
        var: String,
        pin: PinRef,
        mode: PinMode,
    ) -> Result<PinHandle, ResolveError> {
        self.log.borrow_mut().push(format!("pin {key} {pin}"));
        if self.fail_on == Some(key) {
            return Err(ResolveError::PinInUse {
                pin,
                owner: "other.dc_pin".into(),
            });
        }
        Ok(PinHandle { var, pin, mode })
    }
}

struct Callbacks(Log);

impl CallbackCompiler for Callbacks {
    fn compile(
        &mut self,
        var: String,
        source: &str,
        signature: &CallbackSignature,
    ) -> Result<CallbackHandle, ResolveError> {
        self.0.borrow_mut().push(format!("compile {source}"));
        Ok(CallbackHandle {
            var,
            signature: signature.clone(),
            body: source.to_string(),
        })
    }
}

fn recording(log: &Log) -> Collaborators {
    Collaborators {
        components: Box::new(Components(log.clone())),
        displays: Box::new(Displays(log.clone())),
        buses: Box::new(Buses(log.clone())),
        pins: Box::new(Pins {
            log: log.clone(),
            fail_on: None,
        }),
        callbacks: Box::new(Callbacks(log.clone())),
    }
}

fn validated(src: &str) -> ValidatedConfig {
    let raw: RawConfig = toml::from_str(src).unwrap();
    gc9106::MODEL.schema().unwrap().validate(&raw).unwrap()
}

fn claimed(id: &str) -> IdAllocator {
    let mut ids = IdAllocator::new();
    ids.claim(id);
    ids
}

fn run(src: &str, log: &Log) -> Result<SetupSequence, GenError> {
    let mut collaborators = recording(log);
    sequence(
        &gc9106::MODEL,
        "tft",
        validated(src),
        &mut claimed("tft"),
        &mut collaborators,
    )
}

fn position(names: &[&str], name: &str) -> usize {
    names.iter().position(|n| *n == name).unwrap()
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[test]
fn scenario_a_defaults_only() {
    let log = Log::default();
    let seq = run("dc_pin = \"GPIO4\"", &log).unwrap();

    assert_eq!(
        seq.op_names(),
        vec![
            "construct",
            "register_polling",
            "register_display",
            "register_bus",
            "set_dc_pin"
        ]
    );
    assert_eq!(
        seq.descriptor(),
        Some(&PeripheralDescriptor {
            id: "tft".into(),
            class: "gc9106::GC9106",
            ctor_args: vec![
                Value::Int(80),
                Value::Int(160),
                Value::Int(0),
                Value::Int(0),
                Value::Bool(false),
                Value::Bool(true),
                Value::Bool(false),
            ],
        })
    );
    match &seq.ops[1] {
        SetupOp::RegisterPolling { polling } => {
            assert_eq!(polling.interval, Duration::from_secs(1))
        }
        other => panic!("unexpected op {other:?}"),
    }
    match &seq.ops[4] {
        SetupOp::SetDcPin { pin } => assert_eq!(pin.pin, PinRef::gpio(4)),
        other => panic!("unexpected op {other:?}"),
    }

    assert_eq!(
        *log.borrow(),
        vec![
            "component tft 1000ms",
            "display tft 80x160",
            "bus tft 8000000",
            "pin dc_pin GPIO4",
        ]
    );
}

#[test]
fn scenario_b_reset_pin_and_writer() {
    let log = Log::default();
    let seq = run(
        r#"
dc_pin = "GPIO4"
reset_pin = "GPIO5"
lambda = "it.fill(COLOR_ON);"
"#,
        &log,
    )
    .unwrap();

    let names = seq.op_names();
    assert_eq!(
        names,
        vec![
            "construct",
            "register_polling",
            "register_display",
            "set_reset_pin",
            "set_writer",
            "register_bus",
            "set_dc_pin"
        ]
    );
    assert!(position(&names, "set_reset_pin") < position(&names, "set_dc_pin"));
    match &seq.ops[4] {
        SetupOp::SetWriter { writer } => {
            assert_eq!(writer.body, "it.fill(COLOR_ON);");
            assert_eq!(writer.signature, CallbackSignature::display_writer());
        }
        other => panic!("unexpected op {other:?}"),
    }
    assert_eq!(log.borrow()[2], "pin reset_pin GPIO5");
    assert_eq!(log.borrow()[3], "compile it.fill(COLOR_ON);");
}

#[test]
fn scenario_c_geometry_rejected_by_registrar() {
    let config = validated("dc_pin = \"GPIO4\"\ndevice_width = 0");
    assert_eq!(config.int("device_width"), Some(0));

    let log = Log::default();
    let mut collaborators = recording(&log);
    collaborators.displays = Box::new(DisplayTable::new());
    let err = sequence(
        &gc9106::MODEL,
        "tft",
        config,
        &mut claimed("tft"),
        &mut collaborators,
    )
    .unwrap_err();

    assert_eq!(err.instance(), "tft");
    assert_eq!(err.key(), Some("device_width"));
    assert!(matches!(
        err,
        GenError::Registration {
            registrar: "display",
            source: RegisterError::InvalidGeometry { .. },
            ..
        }
    ));
    // Nothing after the display registration ran.
    assert_eq!(*log.borrow(), vec!["component tft 1000ms"]);
}

// ─── Ordering properties ────────────────────────────────────────────

#[test]
fn pages_are_compiled_in_order_instead_of_writer() {
    let log = Log::default();
    let seq = run(
        r#"
dc_pin = "GPIO4"
pages = [{ id = "main", lambda = "it.print(0, 0, id(f), \"a\");" }, { lambda = "it.fill(COLOR_OFF);" }]
"#,
        &log,
    )
    .unwrap();

    assert!(!seq.op_names().contains(&"set_writer"));
    match &seq.ops[3] {
        SetupOp::SetPages { pages } => {
            assert_eq!(pages.len(), 2);
            assert_eq!(pages[0].var, "main");
            assert_eq!(pages[1].var, "tft_page_1");
            assert_eq!(pages[1].callback.body, "it.fill(COLOR_OFF);");
            assert_eq!(pages[0].callback.var, "lambda_1");
            assert_eq!(pages[1].callback.var, "lambda_2");
        }
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn cs_pin_resolves_before_bus_registration() {
    let log = Log::default();
    let seq = run("dc_pin = \"GPIO4\"\ncs_pin = \"GPIO5\"\ndata_rate = \"4MHz\"", &log).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            "component tft 1000ms",
            "display tft 80x160",
            "pin cs_pin GPIO5",
            "bus tft 4000000",
            "pin dc_pin GPIO4",
        ]
    );
    match &seq.ops[3] {
        SetupOp::RegisterBus { binding } => {
            assert_eq!(binding.cs_pin.as_ref().map(|p| p.pin), Some(PinRef::gpio(5)));
        }
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn dc_pin_failure_names_key_and_instance() {
    let log = Log::default();
    let mut collaborators = recording(&log);
    collaborators.pins = Box::new(Pins {
        log: log.clone(),
        fail_on: Some("dc_pin"),
    });
    let err = sequence(
        &gc9106::MODEL,
        "tft",
        validated("dc_pin = \"GPIO4\"\nreset_pin = \"GPIO5\""),
        &mut claimed("tft"),
        &mut collaborators,
    )
    .unwrap_err();

    assert_eq!(err.instance(), "tft");
    assert_eq!(err.key(), Some("dc_pin"));
    assert!(matches!(
        err,
        GenError::Resolution {
            source: ResolveError::PinInUse { .. },
            ..
        }
    ));
}

#[test]
fn inverted_reset_pin_is_preserved() {
    let log = Log::default();
    let seq = run(
        "dc_pin = \"GPIO4\"\nreset_pin = { number = \"GPIO5\", inverted = true }",
        &log,
    )
    .unwrap();
    match &seq.ops[3] {
        SetupOp::SetResetPin { pin } => assert_eq!(pin.pin, PinRef::gpio(5).inverted()),
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn reference_collaborators_reject_value_returning_writer() {
    use dpgen::collaborators::{SpiBus, SpiBusTable};

    let buses = SpiBusTable::new(vec![SpiBus {
        id: "spi_bus".into(),
        clk: PinRef::gpio(18),
        mosi: Some(PinRef::gpio(23)),
        miso: None,
        max_data_rate_hz: 40_000_000,
    }]);
    let mut collaborators = Collaborators::reference(buses).unwrap();
    let err = sequence(
        &gc9106::MODEL,
        "tft",
        validated("dc_pin = \"GPIO4\"\nlambda = \"return 1;\""),
        &mut claimed("tft"),
        &mut collaborators,
    )
    .unwrap_err();
    assert_eq!(err.key(), Some("lambda"));
}

#[test]
fn generated_names_skip_ids_already_in_use() {
    let log = Log::default();
    let mut ids = claimed("tft");
    for taken in ["tft_dc_pin", "tft_reset_pin", "lambda_1", "tft_page_1"] {
        ids.claim(taken);
    }
    let seq = sequence(
        &gc9106::MODEL,
        "tft",
        validated(
            r#"
dc_pin = "GPIO4"
reset_pin = "GPIO5"
pages = [{ lambda = "it.fill(COLOR_OFF);" }]
"#,
        ),
        &mut ids,
        &mut recording(&log),
    )
    .unwrap();

    match (&seq.ops[3], &seq.ops[4], &seq.ops[6]) {
        (
            SetupOp::SetResetPin { pin: reset },
            SetupOp::SetPages { pages },
            SetupOp::SetDcPin { pin: dc },
        ) => {
            assert_eq!(reset.var, "tft_reset_pin_2");
            assert_eq!(pages[0].var, "tft_page_2");
            assert_eq!(pages[0].callback.var, "lambda_2");
            assert_eq!(dc.var, "tft_dc_pin_2");
        }
        other => panic!("unexpected ops {other:?}"),
    }
    for generated in ["tft_reset_pin_2", "tft_page_2", "lambda_2", "tft_dc_pin_2"] {
        assert!(ids.is_claimed(generated), "{generated}");
    }
}
