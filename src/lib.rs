/*!
# Chemical Equipment Visualizer

A small two-tier application for chemical-equipment readings, built in Rust.

## Overview

Operators upload CSV exports of equipment readings. The backend validates
each file, computes summary statistics, keeps a short rolling history of the
most recent uploads and renders PDF reports. A client uploads files, polls
the backend and renders the same statistics as text and charts.

## Architecture

### Core pipeline
- **ingest**: CSV parsing, required-column validation, per-cell numeric coercion
- **summary**: row count, per-column means, equipment type distribution
- **store**: file-backed dataset records with an eager retention trim

### Backend Layer
- **Technologies**: Rust, axum, tokio
- **report**: paginated PDF rendering of a stored summary
- **auth**: token authentication middleware
- **app**: routing, handlers and error responses

### Client Layer
- **client**: HTTP client for the API
- **dashboard**: client state driven by events from worker tasks
- **charts**: PNG bar charts of averages and type distribution

## Required columns

`Equipment Name`, `Type`, `Flowrate`, `Pressure`, `Temperature`. Matching is
exact and case-sensitive. Numeric cells that cannot be parsed are treated as
missing; a column with no valid value has an undefined mean, reported as
JSON `null` and displayed as `N/A`.

## REST API Endpoints

All endpoints except `/health` require `Authorization: Token <token>`.

- `POST /api/upload` - Multipart upload (field `file`), returns the summary
- `GET /api/summary/latest` - Most recent dataset
- `GET /api/history` - Retained datasets, most recent first
- `GET /api/report/{id}` - PDF report as `dataset_<id>.pdf`
- `DELETE /api/datasets/{id}` - Administrative delete
*/

pub mod config;
pub mod dashboard;
pub mod error;
pub mod ingest;
pub mod report;
pub mod store;
pub mod summary;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod auth;

#[cfg(feature = "client")]
pub mod charts;
#[cfg(feature = "client")]
pub mod client;

pub use error::{Result, VisualizerError};
pub use store::{DatasetStore, UploadedDataset};
pub use summary::Summary;
