use anyhow::{Context, Result, anyhow};
use image::{Rgba, RgbaImage, imageops};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::layout::fill_rects;

const PAGE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Cards per page as columns by rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGrid {
    pub columns: u32,
    pub rows: u32,
}

impl PageGrid {
    pub fn new(columns: u32, rows: u32) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(anyhow!("page grid must be at least 1x1: {}x{}", columns, rows));
        }
        Ok(Self { columns, rows })
    }

    pub fn cards_per_page(&self) -> usize {
        (self.columns * self.rows) as usize
    }
}

impl Default for PageGrid {
    fn default() -> Self {
        Self {
            columns: 3,
            rows: 3,
        }
    }
}

impl fmt::Display for PageGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

impl FromStr for PageGrid {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let (columns, rows) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow!("page grid must look like 3x3: {}", value))?;
        let columns = columns
            .trim()
            .parse()
            .with_context(|| format!("invalid page grid columns: {}", value))?;
        let rows = rows
            .trim()
            .parse()
            .with_context(|| format!("invalid page grid rows: {}", value))?;
        PageGrid::new(columns, rows)
    }
}

/// Cut-line band drawn around and between page cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutLines {
    pub width: u32,
    pub color: Rgba<u8>,
}

/// Lays `cards` out row by row on a white page. Every cell is as large as
/// the largest card, cards sit at the top-left of their cell, and cut lines
/// run along every cell edge.
pub fn compose_page(cards: &[RgbaImage], grid: PageGrid, cut: CutLines) -> RgbaImage {
    let cell_width = cards.iter().map(RgbaImage::width).max().unwrap_or(0);
    let cell_height = cards.iter().map(RgbaImage::height).max().unwrap_or(0);
    let pitch_x = cell_width + cut.width;
    let pitch_y = cell_height + cut.width;
    let page_width = grid.columns * pitch_x + cut.width;
    let page_height = grid.rows * pitch_y + cut.width;
    let mut page = RgbaImage::from_pixel(page_width, page_height, PAGE_BACKGROUND);

    if cut.width > 0 {
        let columns = (0..=grid.columns)
            .map(|column| ((column * pitch_x) as i32, 0, cut.width, page_height));
        let rows = (0..=grid.rows).map(|row| (0, (row * pitch_y) as i32, page_width, cut.width));
        let bands: Vec<_> = columns.chain(rows).collect();
        fill_rects(&mut page, &bands, cut.color);
    }

    for (index, card) in cards.iter().take(grid.cards_per_page()).enumerate() {
        let column = index as u32 % grid.columns;
        let row = index as u32 / grid.columns;
        let x = cut.width + column * pitch_x;
        let y = cut.width + row * pitch_y;
        imageops::overlay(&mut page, card, x as i64, y as i64);
    }
    page
}

/// Replaces `folder` with one numbered PNG per page (`001.png`, ...).
pub fn save_pages(
    cards: &[RgbaImage],
    grid: PageGrid,
    cut: CutLines,
    folder: &Path,
) -> Result<Vec<PathBuf>> {
    if folder.exists() {
        fs::remove_dir_all(folder)
            .with_context(|| format!("failed to clear {}", folder.display()))?;
    }
    fs::create_dir_all(folder).with_context(|| format!("failed to create {}", folder.display()))?;

    let mut written = Vec::new();
    for (index, chunk) in cards.chunks(grid.cards_per_page()).enumerate() {
        let path = folder.join(format!("{:03}.png", index + 1));
        info!(path = %path.display(), cards = chunk.len(), "saving page");
        compose_page(chunk, grid, cut)
            .save(&path)
            .with_context(|| format!("failed to write page: {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const GRAY: Rgba<u8> = Rgba([208, 208, 208, 255]);

    fn cut(width: u32) -> CutLines {
        CutLines { width, color: GRAY }
    }

    #[test]
    fn parses_grid_text() {
        assert_eq!("2x2".parse::<PageGrid>().unwrap(), PageGrid::new(2, 2).unwrap());
        assert_eq!(" 3 X 4 ".parse::<PageGrid>().unwrap(), PageGrid::new(3, 4).unwrap());
        assert!("3".parse::<PageGrid>().is_err());
        assert!("0x2".parse::<PageGrid>().is_err());
        assert!("ax2".parse::<PageGrid>().is_err());
        assert_eq!(PageGrid::default().to_string(), "3x3");
    }

    #[test]
    fn places_cards_cell_by_cell_between_cut_lines() {
        let cards = vec![
            RgbaImage::from_pixel(10, 20, RED),
            RgbaImage::from_pixel(10, 20, BLUE),
            RgbaImage::from_pixel(6, 6, RED),
        ];
        let page = compose_page(&cards, PageGrid::new(2, 2).unwrap(), cut(2));
        assert_eq!(page.dimensions(), (26, 46));
        assert_eq!(*page.get_pixel(0, 0), GRAY);
        assert_eq!(*page.get_pixel(12, 5), GRAY);
        assert_eq!(*page.get_pixel(5, 22), GRAY);
        assert_eq!(*page.get_pixel(2, 2), RED);
        assert_eq!(*page.get_pixel(14, 2), BLUE);
        assert_eq!(*page.get_pixel(4, 26), RED);
        // Smaller cards leave the rest of their cell white.
        assert_eq!(*page.get_pixel(10, 30), PAGE_BACKGROUND);
        assert_eq!(*page.get_pixel(16, 30), PAGE_BACKGROUND);
    }

    #[test]
    fn zero_width_cut_lines_butt_cells_together() {
        let cards = vec![RgbaImage::from_pixel(4, 4, RED), RgbaImage::from_pixel(4, 4, BLUE)];
        let page = compose_page(&cards, PageGrid::new(2, 1).unwrap(), cut(0));
        assert_eq!(page.dimensions(), (8, 4));
        assert_eq!(*page.get_pixel(3, 0), RED);
        assert_eq!(*page.get_pixel(4, 0), BLUE);
    }

    #[test]
    fn saves_numbered_pages_into_a_fresh_folder() {
        let dir = tempdir().expect("tempdir");
        let folder = dir.path().join("pages");
        fs::create_dir_all(&folder).expect("folder");
        fs::write(folder.join("stale.png"), b"old").expect("stale");

        let cards: Vec<_> = (0..5).map(|_| RgbaImage::from_pixel(4, 4, RED)).collect();
        let written = save_pages(&cards, PageGrid::new(2, 1).unwrap(), cut(1), &folder)
            .expect("pages");
        let names: Vec<_> = written
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["001.png", "002.png", "003.png"]);
        assert!(!folder.join("stale.png").exists());
        let last = image::open(&written[2]).expect("page").to_rgba8();
        assert_eq!(last.dimensions(), (11, 6));
    }
}
