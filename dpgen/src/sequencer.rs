//! Setup sequencer: validated record in, ordered setup operations out.
//!
//! Operation order per instance:
//!
//! 1. `Construct` with the model's constructor arguments
//! 2. `RegisterPolling`
//! 3. `RegisterDisplay`
//! 4. `SetResetPin`, only when `reset_pin` is configured
//! 5. `SetWriter` for `lambda`, or `SetPages` for `pages`, or nothing
//! 6. `RegisterBus` (chip-select pin resolved first)
//! 7. `SetDcPin`
//!
//! Pin, callback and unnamed page objects get their variable names from
//! the build's [`IdAllocator`], so they never clash with user ids.
//!
//! Every step finishes before the next starts. The first collaborator
//! error aborts the instance; operations already returned by collaborators
//! are not rolled back.

use dpgen_common::schemas::{
    CONF_CS_PIN, CONF_DC_PIN, CONF_LAMBDA, CONF_RESET_PIN, CONF_ROTATION, CONF_SPI_ID,
    CONF_UPDATE_INTERVAL,
};
use dpgen_common::validate::ValidatedConfig;
use serde::Serialize;
use tracing::{debug, info};

use crate::collaborators::{
    BusBinding, CallbackHandle, CallbackSignature, Collaborators, DisplaySettings,
    PeripheralHandle, PinHandle, PinMode, PollingSettings, RegisterError, ResolveError, SpiDevice,
};
use crate::error::GenError;
use crate::ids::IdAllocator;
use crate::model::{Behavior, DisplaySetup, PeripheralDescriptor, PeripheralModel};

/// One compiled display page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageHandle {
    /// Variable name of the page object.
    pub var: String,
    pub callback: CallbackHandle,
}

/// One setup operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SetupOp {
    Construct { descriptor: PeripheralDescriptor },
    RegisterPolling { polling: PollingSettings },
    RegisterDisplay { settings: DisplaySettings },
    SetResetPin { pin: PinHandle },
    SetWriter { writer: CallbackHandle },
    SetPages { pages: Vec<PageHandle> },
    RegisterBus { binding: BusBinding },
    SetDcPin { pin: PinHandle },
}

impl SetupOp {
    /// Short name used in logs and tests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Construct { .. } => "construct",
            Self::RegisterPolling { .. } => "register_polling",
            Self::RegisterDisplay { .. } => "register_display",
            Self::SetResetPin { .. } => "set_reset_pin",
            Self::SetWriter { .. } => "set_writer",
            Self::SetPages { .. } => "set_pages",
            Self::RegisterBus { .. } => "register_bus",
            Self::SetDcPin { .. } => "set_dc_pin",
        }
    }
}

/// Ordered setup operations of one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupSequence {
    pub instance: String,
    pub platform: &'static str,
    pub ops: Vec<SetupOp>,
}

impl SetupSequence {
    pub fn op_names(&self) -> Vec<&'static str> {
        self.ops.iter().map(SetupOp::name).collect()
    }

    pub fn descriptor(&self) -> Option<&PeripheralDescriptor> {
        self.ops.iter().find_map(|op| match op {
            SetupOp::Construct { descriptor } => Some(descriptor),
            _ => None,
        })
    }
}

/// Wraps collaborator errors with the instance and key being processed.
struct Step<'a> {
    instance: &'a str,
}

impl Step<'_> {
    fn resolution(&self, key: impl Into<String>) -> impl FnOnce(ResolveError) -> GenError + '_ {
        let key = key.into();
        move |source| GenError::Resolution {
            instance: self.instance.to_string(),
            key,
            source,
        }
    }

    fn registration(
        &self,
        registrar: &'static str,
        fallback_key: &'static str,
    ) -> impl FnOnce(RegisterError) -> GenError + '_ {
        move |source| GenError::Registration {
            instance: self.instance.to_string(),
            key: source.key().unwrap_or(fallback_key).to_string(),
            registrar,
            source,
        }
    }
}

/// Produce the setup sequence of one validated instance.
///
/// Consumes the validated record; the returned sequence owns everything
/// it needs. `id` must already be claimed in `ids`.
pub fn sequence(
    model: &PeripheralModel,
    id: &str,
    config: ValidatedConfig,
    ids: &mut IdAllocator,
    collaborators: &mut Collaborators,
) -> Result<SetupSequence, GenError> {
    let invalid = |source| GenError::Validation {
        instance: id.to_string(),
        source,
    };
    let descriptor = PeripheralDescriptor::from_config(model, id, &config).map_err(invalid)?;
    let setup = DisplaySetup::from_validated(&config).map_err(invalid)?;
    drop(config);

    let step = Step { instance: id };
    let mut ops = Vec::with_capacity(7);

    // 1. construct
    debug!("{id}: constructing {}", descriptor.class);
    ops.push(SetupOp::Construct { descriptor });
    let handle = PeripheralHandle::new(id);

    // 2. polling
    let polling = PollingSettings {
        interval: setup.update_interval,
        setup_priority: setup.setup_priority,
    };
    collaborators
        .components
        .register(&handle, &polling)
        .map_err(step.registration("component", CONF_UPDATE_INTERVAL))?;
    ops.push(SetupOp::RegisterPolling { polling });

    // 3. display
    let settings = DisplaySettings {
        width: setup.width,
        height: setup.height,
        col_start: setup.col_start,
        row_start: setup.row_start,
        limits: model.limits,
        rotation: setup.rotation,
        auto_clear: setup.auto_clear,
    };
    collaborators
        .displays
        .register(&handle, &settings)
        .map_err(step.registration("display", CONF_ROTATION))?;
    ops.push(SetupOp::RegisterDisplay { settings });

    // 4. reset pin
    if let Some(pin) = setup.reset_pin {
        let pin = collaborators
            .pins
            .resolve(
                &handle,
                CONF_RESET_PIN,
                ids.derive(&format!("{id}_{CONF_RESET_PIN}")),
                pin,
                PinMode::Output,
            )
            .map_err(step.resolution(CONF_RESET_PIN))?;
        ops.push(SetupOp::SetResetPin { pin });
    }

    // 5. writer or pages
    let signature = CallbackSignature::display_writer();
    match setup.behavior {
        Behavior::Writer(source) => {
            let writer = collaborators
                .callbacks
                .compile(ids.generate("lambda"), &source, &signature)
                .map_err(step.resolution(CONF_LAMBDA))?;
            ops.push(SetupOp::SetWriter { writer });
        }
        Behavior::Pages(pages) => {
            let mut handles = Vec::with_capacity(pages.len());
            for (idx, page) in pages.into_iter().enumerate() {
                let callback = collaborators
                    .callbacks
                    .compile(ids.generate("lambda"), &page.lambda, &signature)
                    .map_err(step.resolution(format!("pages[{idx}].lambda")))?;
                let var = page
                    .id
                    .unwrap_or_else(|| ids.generate(&format!("{id}_page")));
                handles.push(PageHandle { var, callback });
            }
            ops.push(SetupOp::SetPages { pages: handles });
        }
        Behavior::None => debug!("{id}: no writer configured"),
    }

    // 6. bus
    let cs_pin = setup
        .spi
        .cs_pin
        .map(|pin| {
            collaborators
                .pins
                .resolve(
                    &handle,
                    CONF_CS_PIN,
                    ids.derive(&format!("{id}_{CONF_CS_PIN}")),
                    pin,
                    PinMode::Output,
                )
                .map_err(step.resolution(CONF_CS_PIN))
        })
        .transpose()?;
    let device = SpiDevice {
        spi_id: setup.spi.spi_id,
        cs_pin,
        data_rate_hz: setup.spi.data_rate_hz,
        mode: setup.spi.mode,
    };
    let binding = collaborators
        .buses
        .register(&handle, &device)
        .map_err(step.registration("bus", CONF_SPI_ID))?;
    ops.push(SetupOp::RegisterBus { binding });

    // 7. dc pin
    let pin = collaborators
        .pins
        .resolve(
            &handle,
            CONF_DC_PIN,
            ids.derive(&format!("{id}_{CONF_DC_PIN}")),
            setup.dc_pin,
            PinMode::Output,
        )
        .map_err(step.resolution(CONF_DC_PIN))?;
    ops.push(SetupOp::SetDcPin { pin });

    info!("{id}: {} setup operations", ops.len());
    Ok(SetupSequence {
        instance: id.to_string(),
        platform: model.name,
        ops,
    })
}
