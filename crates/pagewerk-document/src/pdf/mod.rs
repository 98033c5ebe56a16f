// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: searchable multi-page output for process-pages sessions.

pub mod renderer;

pub use renderer::PdfRenderer;
