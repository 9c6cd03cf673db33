//! Extraction options and configuration.

/// Header row written when a document has no tables and lines are dumped instead.
pub const LINE_FALLBACK_HEADER: &str = "Detected Lines (No Table Structure Found)";

/// Options for extracting artifacts from a block graph.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Spatial reconstruction tolerances
    pub spatial: SpatialConfig,

    /// Try spatial reconstruction before the structural builder
    pub prefer_spatial: bool,

    /// Header row for the line-dump fallback
    pub line_fallback_header: String,

    /// Process independent documents in parallel (batch only)
    pub parallel: bool,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set spatial configuration.
    pub fn with_spatial_config(mut self, config: SpatialConfig) -> Self {
        self.spatial = config;
        self
    }

    /// Skip spatial reconstruction and use declared cell structure only.
    pub fn structural_only(mut self) -> Self {
        self.prefer_spatial = false;
        self
    }

    /// Set the line-dump header row.
    pub fn with_line_fallback_header(mut self, header: impl Into<String>) -> Self {
        self.line_fallback_header = header.into();
        self
    }

    /// Enable or disable parallel batch processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel batch processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            spatial: SpatialConfig::default(),
            prefer_spatial: true,
            line_fallback_header: LINE_FALLBACK_HEADER.to_string(),
            parallel: true,
        }
    }
}

/// Spatial reconstruction configuration.
///
/// Tolerances are proportions of measured word heights and table width,
/// clamped to fixed bounds in fractional page units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialConfig {
    /// Row tolerance as a fraction of mean word height
    pub row_tolerance_factor: f64,
    /// Lower bound for the row tolerance
    pub min_row_tolerance: f64,
    /// Upper bound for the row tolerance
    pub max_row_tolerance: f64,
    /// Boundary tolerance as a fraction of the edge extent
    pub boundary_tolerance_factor: f64,
    /// Lower bound for the boundary tolerance
    pub min_boundary_tolerance: f64,
    /// Upper bound for the boundary tolerance
    pub max_boundary_tolerance: f64,
    /// Minimum number of column boundaries (two make one column)
    pub min_boundaries: usize,
}

impl SpatialConfig {
    /// Row tolerance for a given mean word height.
    pub fn row_tolerance(&self, mean_height: f64) -> f64 {
        (mean_height * self.row_tolerance_factor)
            .min(self.max_row_tolerance)
            .max(self.min_row_tolerance)
    }

    /// Boundary tolerance for a given edge extent.
    pub fn boundary_tolerance(&self, doc_width: f64) -> f64 {
        (doc_width * self.boundary_tolerance_factor)
            .min(self.max_boundary_tolerance)
            .max(self.min_boundary_tolerance)
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            row_tolerance_factor: 0.5,
            min_row_tolerance: 0.005,
            max_row_tolerance: 0.02,
            boundary_tolerance_factor: 0.02,
            min_boundary_tolerance: 0.01,
            max_boundary_tolerance: 0.03,
            min_boundaries: 2,
        }
    }
}
