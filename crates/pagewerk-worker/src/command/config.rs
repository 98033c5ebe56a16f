// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Initialization, engine variables and input/output names.

use std::path::PathBuf;

use pagewerk_core::engine::EngineInit;
use pagewerk_core::error::CommandError;
use pagewerk_core::types::{EngineMode, InitOptions};
use pagewerk_core::value::Value;
use tracing::{debug, info};

use crate::worker::WorkerState;

const METHOD_INIT: &str = "init";

pub(super) fn init(state: &mut WorkerState, options: InitOptions) -> Result<Value, CommandError> {
    let engine_init = engine_init(&options, state.config.data_path.as_ref())?;
    debug!(
        language = %engine_init.language,
        mode = ?engine_init.mode,
        variables = engine_init.variables.len(),
        "Initializing engine"
    );

    if !state.engine.init(&engine_init) {
        return Err(CommandError::engine(
            METHOD_INIT,
            format!(
                "engine failed to initialize (languages '{}')",
                engine_init.language
            ),
        ));
    }

    state.initialized = true;
    info!(language = %engine_init.language, "Engine initialized");
    Ok(Value::Void)
}

/// Validate host options and fill in worker defaults.
fn engine_init(
    options: &InitOptions,
    default_data_path: Option<&PathBuf>,
) -> Result<EngineInit, CommandError> {
    let mode = match options.oem {
        Some(raw) => EngineMode::try_from(raw).map_err(|value| CommandError::OutOfRange {
            method: METHOD_INIT,
            what: "engine mode",
            value: value.into(),
        })?,
        None => EngineMode::default(),
    };

    if options.vars_vec.len() != options.vars_values.len() {
        return Err(CommandError::invalid_argument(
            METHOD_INIT,
            "vars_vec and vars_values must both be set and same length",
        ));
    }
    if options.vars_vec.iter().any(|name| name.is_empty()) {
        return Err(CommandError::invalid_argument(
            METHOD_INIT,
            "variable names in vars_vec must not be empty",
        ));
    }
    if options.langs.iter().any(|lang| lang.trim().is_empty()) {
        return Err(CommandError::invalid_argument(
            METHOD_INIT,
            "language names must not be empty",
        ));
    }
    if options.configs.iter().any(|config| config.is_empty()) {
        return Err(CommandError::invalid_argument(
            METHOD_INIT,
            "config names must not be empty",
        ));
    }

    let data_path = options
        .data_path
        .as_deref()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .or_else(|| default_data_path.cloned());

    Ok(EngineInit {
        data_path,
        language: options.langs.join("+"),
        mode,
        configs: options.configs.clone(),
        variables: options
            .vars_vec
            .iter()
            .cloned()
            .zip(options.vars_values.iter().cloned())
            .collect(),
        set_only_non_debug_params: options.set_only_non_debug_params,
    })
}

pub(super) fn set_variable(
    state: &mut WorkerState,
    method: &'static str,
    name: &str,
    value: &str,
    debug_variable: bool,
) -> Result<Value, CommandError> {
    if name.is_empty() {
        return Err(CommandError::invalid_argument(method, "variable name is empty"));
    }
    if value.is_empty() {
        return Err(CommandError::invalid_argument(method, "variable value is empty"));
    }

    let accepted = if debug_variable {
        state.engine.set_debug_variable(name, value)
    } else {
        state.engine.set_variable(name, value)
    };
    debug!(method, name, accepted, "Variable set");
    Ok(Value::Bool(accepted))
}

/// Shared body of the typed variable getters. `lookup` returns `None` for
/// unknown names or names of another type.
pub(super) fn get_variable(
    method: &'static str,
    name: &str,
    lookup: impl FnOnce(&str) -> Option<Value>,
) -> Result<Value, CommandError> {
    if name.is_empty() {
        return Err(CommandError::invalid_argument(method, "variable name is empty"));
    }
    lookup(name).ok_or_else(|| CommandError::NotFound {
        method,
        name: name.to_string(),
    })
}

pub(super) fn set_input_name(
    state: &mut WorkerState,
    method: &'static str,
    name: &str,
) -> Result<Value, CommandError> {
    if name.is_empty() {
        return Err(CommandError::invalid_argument(method, "input name is empty"));
    }
    state.engine.set_input_name(name);
    Ok(Value::Void)
}

pub(super) fn set_output_name(
    state: &mut WorkerState,
    method: &'static str,
    name: &str,
) -> Result<Value, CommandError> {
    if name.is_empty() {
        return Err(CommandError::invalid_argument(method, "output name is empty"));
    }
    state.engine.set_output_name(name);
    Ok(Value::Void)
}
