use std::collections::HashSet;

use crate::constants::{
    EXCLUDED_PACKAGES, HOME_SCREEN_TEXT, KNOWN_RECENTS_CLASSES, OWN_PACKAGE,
    QUICKSTEP_LAUNCHER_CLASS, RECENTS_PANE_TEXT,
};
use crate::event::{ContentChange, EventKind, ForegroundEvent};

/// What one raw foreground event means.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Ignore,
    RecentsEntered,
    RecentsExitedToApp(String),
    ReturnedHome,
    GenuineSwitch {
        package: String,
        triggering: Option<String>,
    },
}

/// Turns the noisy accessibility stream into app-switch decisions.
///
/// The launcher package is resolved once when the detector connects; keyboard
/// IME packages come from the platform's input-method query at the same time.
/// Everything else is exact string matching against fixed lists.
pub struct Classifier {
    launcher_package: Option<String>,
    keyboard_packages: HashSet<String>,
    recents_open: bool,
    last_foreground: Option<String>,
}

impl Classifier {
    pub fn new(launcher_package: Option<String>, keyboard_packages: Vec<String>) -> Self {
        Self {
            launcher_package,
            keyboard_packages: keyboard_packages.into_iter().collect(),
            recents_open: false,
            last_foreground: None,
        }
    }

    pub fn is_recents_open(&self) -> bool {
        self.recents_open
    }

    /// Classifies one event, in priority order: recents entry, recents exit,
    /// home return, genuine switch. Events without a package are discarded.
    pub fn classify(&mut self, event: &ForegroundEvent) -> Classification {
        let pkg = match event.package.as_deref() {
            Some(p) => p,
            None => return Classification::Ignore,
        };

        if event.kind != EventKind::WindowStateChanged {
            return Classification::Ignore;
        }

        if self.signals_recents_entry(event, pkg) {
            self.recents_open = true;
            return Classification::RecentsEntered;
        }

        if self.recents_open && !self.is_launcher(pkg) {
            self.recents_open = false;
            return Classification::RecentsExitedToApp(pkg.to_string());
        }

        if self.signals_home_return(event, pkg) {
            self.recents_open = false;
            return Classification::ReturnedHome;
        }

        if pkg == OWN_PACKAGE
            || self.keyboard_packages.contains(pkg)
            || EXCLUDED_PACKAGES.contains(&pkg)
            || is_recents_class(event.class_name.as_deref())
        {
            return Classification::Ignore;
        }

        let triggering = self.last_foreground.replace(pkg.to_string());
        Classification::GenuineSwitch {
            package: pkg.to_string(),
            triggering,
        }
    }

    fn is_launcher(&self, pkg: &str) -> bool {
        self.launcher_package.as_deref() == Some(pkg)
    }

    fn signals_recents_entry(&self, event: &ForegroundEvent, pkg: &str) -> bool {
        (self.is_launcher(pkg) && event.content_change == ContentChange::PaneAppeared)
            || (event.class_name.as_deref() == Some(QUICKSTEP_LAUNCHER_CLASS)
                && event.text_contains(RECENTS_PANE_TEXT))
    }

    fn signals_home_return(&self, event: &ForegroundEvent, pkg: &str) -> bool {
        (self.is_launcher(pkg) && event.content_change == ContentChange::PaneDisappeared)
            || (self.is_launcher(pkg)
                && event.class_name.as_deref() == Some(QUICKSTEP_LAUNCHER_CLASS)
                && event.text_contains(HOME_SCREEN_TEXT))
    }
}

fn is_recents_class(class_name: Option<&str>) -> bool {
    match class_name {
        Some(c) => KNOWN_RECENTS_CLASSES.contains(&c),
        None => false,
    }
}
