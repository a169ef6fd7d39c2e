use serde::Serialize;

use crate::storage::LectureFile;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;
pub const ZOOM_STEP: f32 = 0.25;
pub const DEFAULT_ZOOM: f32 = 1.5;

/// Page index and zoom for one open document. Page is kept in
/// `[1, total_pages]`, zoom in `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DocumentViewer {
    file: LectureFile,
    page: u32,
    total_pages: u32,
    zoom: f32,
}

impl DocumentViewer {
    /// `total_pages` of zero is treated as a single page.
    pub fn open(file: LectureFile, total_pages: u32) -> Self {
        Self {
            file,
            page: 1,
            total_pages: total_pages.max(1),
            zoom: DEFAULT_ZOOM,
        }
    }

    pub fn file(&self) -> &LectureFile {
        &self.file
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn next_page(&mut self) -> u32 {
        self.go_to(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> u32 {
        self.go_to(self.page.saturating_sub(1))
    }

    pub fn go_to(&mut self, page: u32) -> u32 {
        self.page = page.clamp(1, self.total_pages);
        self.page
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set_zoom(self.zoom + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_zoom(self.zoom - ZOOM_STEP)
    }

    fn set_zoom(&mut self, zoom: f32) -> f32 {
        // Always a multiple of ZOOM_STEP.
        let snapped = (zoom / ZOOM_STEP).round() * ZOOM_STEP;
        self.zoom = snapped.clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom
    }

    pub fn can_go_back(&self) -> bool {
        self.page > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.page < self.total_pages
    }
}
