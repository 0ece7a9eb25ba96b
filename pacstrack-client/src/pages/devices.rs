use pacstrack_model::{ARCHIVE_DEVICE, Device, LOCAL_DESTINATION};

/// Which page a device list is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Storage check: the archive is the reference, never a source.
    Storage,
    /// Study search: any device, archive included, can be queried.
    Studies,
}

/// Source device list of a query form with the current choice.
#[derive(Debug, Clone)]
pub struct DevicePicker {
    kind: PageKind,
    devices: Vec<Device>,
    selected: Option<usize>,
}

impl DevicePicker {
    /// Choose `remembered` when it is still listed, else the first device.
    pub fn new(kind: PageKind, devices: Vec<Device>, remembered: Option<&str>) -> Self {
        let devices: Vec<Device> = match kind {
            PageKind::Storage => devices.into_iter().filter(|d| !d.is_archive()).collect(),
            PageKind::Studies => devices,
        };
        let selected = remembered
            .and_then(|name| devices.iter().position(|d| d.name == name))
            .or_else(|| (!devices.is_empty()).then_some(0));

        Self {
            kind,
            devices,
            selected,
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn selected(&self) -> Option<&Device> {
        self.selected.and_then(|i| self.devices.get(i))
    }

    pub fn find(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Returns false when `name` is not listed.
    pub fn select(&mut self, name: &str) -> bool {
        match self.devices.iter().position(|d| d.name == name) {
            Some(i) => {
                self.selected = Some(i);
                true
            }
            None => false,
        }
    }

    /// Transfer destinations offered next to the result tables.
    pub fn destinations(&self) -> Vec<String> {
        let mut destinations = Vec::with_capacity(self.devices.len() + 2);
        if self.kind == PageKind::Storage {
            destinations.push(ARCHIVE_DEVICE.to_string());
        }
        destinations.push(LOCAL_DESTINATION.to_string());
        destinations.extend(self.devices.iter().map(|d| d.name.clone()));
        destinations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str) -> Device {
        Device {
            name: name.to_string(),
            ae_title: name.to_string(),
            address: "10.0.0.1:104".to_string(),
            imgs_series: None,
            imgs_study: None,
        }
    }

    fn devices() -> Vec<Device> {
        vec![device("PACS"), device("CT_ROOM"), device("MR_ROOM")]
    }

    #[test]
    fn storage_sources_exclude_the_archive() {
        let picker = DevicePicker::new(PageKind::Storage, devices(), None);
        let names: Vec<&str> = picker.devices().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["CT_ROOM", "MR_ROOM"]);
        assert_eq!(picker.selected().map(|d| d.name.as_str()), Some("CT_ROOM"));
        assert_eq!(picker.destinations(), vec!["PACS", "Local", "CT_ROOM", "MR_ROOM"]);
    }

    #[test]
    fn remembered_device_is_restored_by_name() {
        let picker = DevicePicker::new(PageKind::Studies, devices(), Some("MR_ROOM"));
        assert_eq!(picker.selected().map(|d| d.name.as_str()), Some("MR_ROOM"));
        assert_eq!(picker.destinations(), vec!["Local", "PACS", "CT_ROOM", "MR_ROOM"]);
    }

    #[test]
    fn vanished_device_falls_back_to_first() {
        let mut picker = DevicePicker::new(PageKind::Storage, devices(), Some("US_ROOM"));
        assert_eq!(picker.selected().map(|d| d.name.as_str()), Some("CT_ROOM"));
        assert!(!picker.select("PACS"));
        assert!(picker.select("MR_ROOM"));
    }

    #[test]
    fn empty_list_selects_nothing() {
        let picker = DevicePicker::new(PageKind::Storage, vec![device("PACS")], None);
        assert!(picker.selected().is_none());
    }
}
