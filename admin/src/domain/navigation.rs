use serde::Serialize;

pub const DASHBOARD_PATH: &str = "/dashboard";
/// Widths up to this many pixels are laid out as mobile.
pub const MOBILE_BREAKPOINT: u32 = 768;

// id, label and whether the section has an editor
const SECTIONS: [(&str, &str, bool); 9] = [
    ("dashboard", "Dashboard", false),
    ("pages", "Pages", false),
    ("services", "Services", true),
    ("solutions", "Solutions", false),
    ("verticals", "Verticals", false),
    ("blogs", "Blogs", true),
    ("case-studies", "Case Studies", true),
    ("leads", "Leads", false),
    ("subscribed-users", "Subscribed Users", false),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

/// The sidebar menu of the dashboard.
#[derive(Debug, Clone)]
pub struct Navigation {
    items: Vec<MenuItem>,
}

impl MenuItem {
    fn new(id: &str, label: &str, path: String) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
            path,
            children: Vec::new(),
        }
    }
}

impl Navigation {
    /// Flat menu, or with list/create entries under every section that has an editor.
    pub fn new(nested: bool) -> Self {
        let items = SECTIONS
            .iter()
            .map(|&(id, label, editable)| {
                let path = if id == "dashboard" {
                    DASHBOARD_PATH.to_owned()
                } else {
                    format!("{DASHBOARD_PATH}/{id}")
                };
                let mut item = MenuItem::new(id, label, path);
                if nested && editable {
                    item.children = vec![
                        MenuItem::new(&format!("{id}-list"), "All", format!("{}/list", item.path)),
                        MenuItem::new(&format!("{id}-create"), "Create", format!("{}/create", item.path)),
                    ];
                }
                item
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Ids of every item highlighted for `current_path`, parents before children.
    pub fn active(&self, current_path: &str) -> Vec<&str> {
        fn collect<'n>(items: &'n [MenuItem], current_path: &str, active: &mut Vec<&'n str>) {
            for item in items.iter().filter(|item| is_active(&item.path, current_path)) {
                active.push(&item.id);
                collect(&item.children, current_path, active);
            }
        }

        let mut active = Vec::new();
        collect(&self.items, current_path, &mut active);
        active
    }
}

/// The dashboard root only matches itself, every other item matches its subtree.
pub fn is_active(item_path: &str, current_path: &str) -> bool {
    if item_path == DASHBOARD_PATH {
        current_path == DASHBOARD_PATH
    } else {
        current_path.starts_with(item_path)
    }
}

/// Collapse state of the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidebar {
    open: bool,
    mobile: bool,
    current_path: String,
}

impl Sidebar {
    pub fn new(width: u32) -> Self {
        let mut sidebar = Self {
            open: true,
            mobile: false,
            current_path: DASHBOARD_PATH.to_owned(),
        };
        sidebar.resize(width);
        sidebar
    }

    /// Mobile widths close the sidebar, wider ones open it.
    pub fn resize(&mut self, width: u32) {
        self.mobile = width <= MOBILE_BREAKPOINT;
        self.open = !self.mobile;
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn navigate(&mut self, path: &str) {
        self.current_path = path.to_owned();
        if self.mobile {
            self.open = false;
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_mobile(&self) -> bool {
        self.mobile
    }

    /// the dimming overlay is only shown over an open mobile sidebar
    pub fn shows_overlay(&self) -> bool {
        self.open && self.mobile
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }
}
