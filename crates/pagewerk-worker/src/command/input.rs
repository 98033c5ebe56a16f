// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image input, page geometry and thresholding commands.

use pagewerk_core::error::CommandError;
use pagewerk_core::raster::Raster;
use pagewerk_core::types::{PageSegMode, Rectangle};
use pagewerk_core::value::Value;
use pagewerk_document::image::decode;
use tracing::debug;

use super::ImageInput;
use crate::worker::WorkerState;

fn decode_buffer(method: &'static str, data: &[u8]) -> Result<Raster, CommandError> {
    if data.is_empty() {
        return Err(CommandError::invalid_argument(method, "input buffer is empty"));
    }
    decode(data).map_err(|err| CommandError::from_library(method, &err))
}

fn positive(method: &'static str, what: &'static str, value: i32) -> Result<u32, CommandError> {
    if value <= 0 {
        return Err(CommandError::OutOfRange {
            method,
            what,
            value: value.into(),
        });
    }
    Ok(value as u32)
}

fn non_negative(method: &'static str, what: &'static str, value: i32) -> Result<u32, CommandError> {
    if value < 0 {
        return Err(CommandError::OutOfRange {
            method,
            what,
            value: value.into(),
        });
    }
    Ok(value as u32)
}

pub(super) fn set_input_image(
    state: &mut WorkerState,
    method: &'static str,
    data: &[u8],
) -> Result<Value, CommandError> {
    let raster = decode_buffer(method, data)?;
    debug!(
        width = raster.width(),
        height = raster.height(),
        depth = raster.depth(),
        "Input image decoded"
    );
    state.engine.set_input_image(raster);
    Ok(Value::Void)
}

pub(super) fn get_input_image(
    state: &mut WorkerState,
    method: &'static str,
) -> Result<Value, CommandError> {
    state
        .engine
        .input_image()
        .map(|raster| Value::Buffer(raster.data().to_vec()))
        .ok_or_else(|| CommandError::engine(method, "engine has no input image"))
}

pub(super) fn set_page_mode(
    state: &mut WorkerState,
    method: &'static str,
    mode: i32,
) -> Result<Value, CommandError> {
    let mode = PageSegMode::try_from(mode).map_err(|value| CommandError::OutOfRange {
        method,
        what: "page segmentation mode",
        value: value.into(),
    })?;
    state.engine.set_page_seg_mode(mode);
    Ok(Value::Void)
}

pub(super) fn set_rectangle(
    state: &mut WorkerState,
    method: &'static str,
    rect: Rectangle,
) -> Result<Value, CommandError> {
    non_negative(method, "rectangle left", rect.left)?;
    non_negative(method, "rectangle top", rect.top)?;
    positive(method, "rectangle width", rect.width)?;
    positive(method, "rectangle height", rect.height)?;
    state.engine.set_rectangle(rect);
    Ok(Value::Void)
}

pub(super) fn set_source_resolution(
    state: &mut WorkerState,
    method: &'static str,
    ppi: i32,
) -> Result<Value, CommandError> {
    let ppi = positive(method, "source resolution", ppi)?;
    state.engine.set_source_resolution(ppi);
    Ok(Value::Void)
}

pub(super) fn set_image(
    state: &mut WorkerState,
    method: &'static str,
    input: ImageInput,
) -> Result<Value, CommandError> {
    let raster = match input {
        ImageInput::Encoded(data) => {
            if data.is_empty() {
                return Err(CommandError::invalid_argument(method, "buffer is empty"));
            }
            decode_buffer(method, &data)?
        }
        ImageInput::Raw {
            pixels,
            width,
            height,
            bytes_per_pixel,
            bytes_per_line,
        } => {
            if pixels.is_empty() {
                return Err(CommandError::invalid_argument(method, "buffer is empty"));
            }
            let width = positive(method, "image width", width)?;
            let height = positive(method, "image height", height)?;
            if !matches!(bytes_per_pixel, 0 | 1 | 3 | 4) {
                return Err(CommandError::OutOfRange {
                    method,
                    what: "bytes per pixel",
                    value: bytes_per_pixel.into(),
                });
            }
            let bytes_per_line = positive(method, "bytes per line", bytes_per_line)?;
            Raster::from_raw_pixels(
                &pixels,
                width,
                height,
                bytes_per_pixel as u32,
                bytes_per_line,
            )
            .map_err(|err| CommandError::invalid_argument(method, err.to_string()))?
        }
    };
    state.engine.set_image(raster);
    Ok(Value::Void)
}

pub(super) fn get_thresholded_image(
    state: &mut WorkerState,
    method: &'static str,
) -> Result<Value, CommandError> {
    state
        .engine
        .thresholded_image()
        .map(|raster| Value::Buffer(raster.into_data()))
        .ok_or_else(|| CommandError::engine(method, "engine produced no thresholded image"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pagewerk_core::config::WorkerConfig;
    use pagewerk_core::error::ErrorCode;

    use super::*;
    use crate::testing::{FakeEngine, encoded_page};

    fn ready_state() -> WorkerState {
        let mut state = WorkerState::new(
            Box::new(FakeEngine::default()),
            Arc::new(WorkerConfig::default()),
        );
        state.initialized = true;
        state
    }

    #[test]
    fn undecodable_input_is_an_engine_error() {
        let mut state = ready_state();
        let err = set_input_image(&mut state, "setInputImage", b"not an image")
            .expect_err("garbage");
        assert_eq!(err.code(), ErrorCode::EngineRuntime);
        assert!(err.to_string().starts_with("setInputImage: image processing failed"));

        let err = set_input_image(&mut state, "setInputImage", &[]).expect_err("empty");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(state.engine.input_image().is_none());
    }

    #[test]
    fn decoded_input_reaches_the_engine() {
        let mut state = ready_state();
        set_input_image(&mut state, "setInputImage", &encoded_page()).expect("decode");
        let raster = state.engine.input_image().expect("input image");
        assert_eq!((raster.width(), raster.height()), (16, 12));
    }

    #[test]
    fn geometry_limits_are_out_of_range() {
        let mut state = ready_state();
        let err = set_source_resolution(&mut state, "setSourceResolution", 0)
            .expect_err("zero ppi");
        assert_eq!(err.code(), ErrorCode::OutOfRange);

        let rect = Rectangle {
            left: -1,
            top: 0,
            width: 10,
            height: 10,
        };
        let err = set_rectangle(&mut state, "setRectangle", rect).expect_err("negative left");
        assert_eq!(
            err.to_string(),
            "setRectangle: rectangle left is out of range; received -1"
        );
    }
}
