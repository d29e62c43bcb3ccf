//! Instruction fetch map.
//!
//! Opcodes, immediates and displacements are read through a 256-entry page
//! table rather than the bus. Each page points at an offset inside one of the
//! byte buffers held in the map's arena. Fetches are bounds checked: a page
//! with nothing mapped, or one whose buffer runs out part way, reads as the
//! fill byte (HALT unless configured otherwise).

use tracing::{debug, warn};

use crate::error::Z80Error;

/// Handle to a buffer stored in a [`FetchMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(usize);

#[derive(Debug, Clone, Copy)]
struct PageEntry {
    region: RegionId,
    offset: usize,
}

/// Page table plus the buffers it points into.
#[derive(Debug, Clone)]
pub struct FetchMap {
    regions: Vec<Vec<u8>>,
    pages: [Option<PageEntry>; 256],
    fill: u8,
    /// One bit per page; set once the page's unmapped fetch has been logged.
    warned: [u64; 4],
}

impl FetchMap {
    #[must_use]
    pub fn new(fill: u8) -> Self {
        Self {
            regions: Vec::new(),
            pages: [None; 256],
            fill,
            warned: [0; 4],
        }
    }

    /// Take ownership of a buffer so pages can be mapped onto it.
    pub fn add_region(&mut self, data: Vec<u8>) -> RegionId {
        self.regions.push(data);
        let id = RegionId(self.regions.len() - 1);
        debug!(region = id.0, len = self.regions[id.0].len(), "fetch region added");
        id
    }

    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<&[u8]> {
        self.regions.get(id.0).map(Vec::as_slice)
    }

    /// Mutable access to a region's bytes, e.g. to reload a bank in place.
    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut [u8]> {
        self.regions.get_mut(id.0).map(Vec::as_mut_slice)
    }

    /// Map pages `first_page..=last_page` onto `region` starting at
    /// `offset`. Page `first_page + n` reads from `offset + n * 256`.
    pub fn map_fetch_region(
        &mut self,
        first_page: u8,
        last_page: u8,
        region: RegionId,
        offset: usize,
    ) -> Result<(), Z80Error> {
        if first_page > last_page {
            return Err(Z80Error::InvalidPageRange {
                first: first_page,
                last: last_page,
            });
        }
        let len = self
            .region(region)
            .map(<[u8]>::len)
            .ok_or(Z80Error::UnknownRegion(region))?;
        if offset >= len {
            return Err(Z80Error::OffsetOutOfBounds { offset, len });
        }

        for (n, page) in (first_page..=last_page).enumerate() {
            self.pages[page as usize] = Some(PageEntry {
                region,
                offset: offset + n * 0x100,
            });
            self.clear_warned(page);
        }
        debug!(
            first_page,
            last_page,
            region = region.0,
            offset,
            "fetch pages mapped"
        );
        Ok(())
    }

    /// Return pages `first_page..=last_page` to the fill byte.
    pub fn unmap_fetch_region(&mut self, first_page: u8, last_page: u8) -> Result<(), Z80Error> {
        if first_page > last_page {
            return Err(Z80Error::InvalidPageRange {
                first: first_page,
                last: last_page,
            });
        }
        for page in first_page..=last_page {
            self.pages[page as usize] = None;
            self.clear_warned(page);
        }
        debug!(first_page, last_page, "fetch pages unmapped");
        Ok(())
    }

    #[must_use]
    pub fn is_mapped(&self, page: u8) -> bool {
        self.pages[page as usize].is_some()
    }

    /// Read the instruction byte at `address`.
    pub fn fetch(&mut self, address: u16) -> u8 {
        let page = (address >> 8) as u8;
        match self.pages[page as usize] {
            Some(entry) => self.regions[entry.region.0]
                .get(entry.offset + usize::from(address & 0xFF))
                .copied()
                .unwrap_or(self.fill),
            None => {
                self.warn_unmapped(page, address);
                self.fill
            }
        }
    }

    /// Read without the unmapped-page warning side effect.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.pages[(address >> 8) as usize]
            .and_then(|entry| {
                self.regions[entry.region.0]
                    .get(entry.offset + usize::from(address & 0xFF))
                    .copied()
            })
            .unwrap_or(self.fill)
    }

    fn warn_unmapped(&mut self, page: u8, address: u16) {
        let (word, bit) = (page as usize / 64, page % 64);
        if self.warned[word] & (1 << bit) == 0 {
            self.warned[word] |= 1 << bit;
            warn!(address, fill = self.fill, "instruction fetch from unmapped page");
        }
    }

    fn clear_warned(&mut self, page: u8) {
        self.warned[page as usize / 64] &= !(1 << (page % 64));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_pages_read_fill_byte() {
        let mut map = FetchMap::new(0x76);
        assert_eq!(map.fetch(0x0000), 0x76);
        assert_eq!(map.fetch(0xFFFF), 0x76);
    }

    #[test]
    fn pages_step_through_region() {
        let mut map = FetchMap::new(0x76);
        let data: Vec<u8> = (0..=0x2FF).map(|i| (i >> 8) as u8).collect();
        let rom = map.add_region(data);
        map.map_fetch_region(0x80, 0x82, rom, 0).unwrap();
        assert_eq!(map.fetch(0x8000), 0);
        assert_eq!(map.fetch(0x81FF), 1);
        assert_eq!(map.fetch(0x8210), 2);
        assert_eq!(map.fetch(0x8300), 0x76);
    }

    #[test]
    fn short_region_falls_back_to_fill() {
        let mut map = FetchMap::new(0x00);
        let rom = map.add_region(vec![0xAA; 0x180]);
        map.map_fetch_region(0x10, 0x11, rom, 0).unwrap();
        assert_eq!(map.fetch(0x117F), 0xAA);
        assert_eq!(map.fetch(0x1180), 0x00);
    }

    #[test]
    fn offset_selects_bank() {
        let mut map = FetchMap::new(0x76);
        let mut data = vec![0x11; 0x100];
        data.extend_from_slice(&[0x22; 0x100]);
        let rom = map.add_region(data);
        map.map_fetch_region(0x40, 0x40, rom, 0x100).unwrap();
        assert_eq!(map.fetch(0x4000), 0x22);

        map.region_mut(rom).unwrap()[0x100] = 0x33;
        assert_eq!(map.fetch(0x4000), 0x33);
    }

    #[test]
    fn rejects_bad_setup() {
        let mut map = FetchMap::new(0x76);
        let rom = map.add_region(vec![0; 0x100]);
        assert_eq!(
            map.map_fetch_region(2, 1, rom, 0),
            Err(Z80Error::InvalidPageRange { first: 2, last: 1 })
        );
        assert_eq!(
            map.map_fetch_region(0, 0, rom, 0x100),
            Err(Z80Error::OffsetOutOfBounds { offset: 0x100, len: 0x100 })
        );
        assert_eq!(
            map.map_fetch_region(0, 0, RegionId(7), 0),
            Err(Z80Error::UnknownRegion(RegionId(7)))
        );
    }

    #[test]
    fn unmap_restores_fill() {
        let mut map = FetchMap::new(0x76);
        let rom = map.add_region(vec![0; 0x100]);
        map.map_fetch_region(0, 0, rom, 0).unwrap();
        assert!(map.is_mapped(0));
        map.unmap_fetch_region(0, 0).unwrap();
        assert!(!map.is_mapped(0));
        assert_eq!(map.peek(0x0000), 0x76);
    }
}
