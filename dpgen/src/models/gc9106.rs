//! GC9106 SPI TFT controller.
//!
//! 132x162 RAM; the common 0.96" panels expose an 80x160 window of it.

use std::time::Duration;

use dpgen_common::schema::{Schema, SchemaError};
use dpgen_common::schemas::{
    component_schema, display_schema, polling_schema, spi_device_schema, CONF_DC_PIN,
    CONF_RESET_PIN, DEFAULT_UPDATE_INTERVAL,
};
use dpgen_common::value::FieldType;

use crate::collaborators::Geometry;
use crate::model::{
    PeripheralModel, CONF_COL_START, CONF_DEVICE_HEIGHT, CONF_DEVICE_WIDTH, CONF_ROW_START,
};

pub const CONF_EIGHT_BIT_COLOR: &str = "eight_bit_color";
pub const CONF_USE_BGR: &str = "use_bgr";
pub const CONF_INVERT_COLORS: &str = "invert_colors";

const UPDATE_INTERVAL: Duration = Duration::from_secs(1);
const DATA_RATE_HZ: u32 = 8_000_000;

const CTOR_KEYS: &[&str] = &[
    CONF_DEVICE_WIDTH,
    CONF_DEVICE_HEIGHT,
    CONF_COL_START,
    CONF_ROW_START,
    CONF_EIGHT_BIT_COLOR,
    CONF_USE_BGR,
    CONF_INVERT_COLORS,
];

pub const MODEL: PeripheralModel = PeripheralModel::new(
    "gc9106",
    "gc9106::GC9106",
    CTOR_KEYS,
    Geometry {
        width: 132,
        height: 162,
    },
    schema,
);

fn schema() -> Result<Schema, SchemaError> {
    let base = display_schema()?
        .extend(
            &Schema::builder()
                .optional(CONF_RESET_PIN, FieldType::Pin)
                .build()?,
        )?
        .extend(&polling_schema(DEFAULT_UPDATE_INTERVAL)?)?
        .extend(&polling_schema(UPDATE_INTERVAL)?)?;

    let panel = Schema::builder()
        .required(CONF_DC_PIN, FieldType::Pin)
        .with_default(CONF_DEVICE_WIDTH, FieldType::Int, 80_i64)
        .with_default(CONF_DEVICE_HEIGHT, FieldType::Int, 160_i64)
        .with_default(CONF_COL_START, FieldType::Int, 0_i64)
        .with_default(CONF_ROW_START, FieldType::Int, 0_i64)
        .with_default(CONF_EIGHT_BIT_COLOR, FieldType::Bool, false)
        .with_default(CONF_USE_BGR, FieldType::Bool, true)
        .with_default(CONF_INVERT_COLORS, FieldType::Bool, false)
        .build()?;

    base.extend(&panel)?
        .extend(&component_schema()?)?
        .extend(&spi_device_schema(DATA_RATE_HZ)?)
}
