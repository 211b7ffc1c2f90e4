//! Javadoc hyperlinks for resolved classes and methods.

use crate::metadata::{ClassDescriptor, MethodDescriptor};
use serde::{Deserialize, Serialize};

/// How method anchors are spelled inside a class page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorStyle {
    /// `name-arg1-arg2-`, as produced by Javadoc up to JDK 9.
    #[default]
    Legacy,
    /// `name(arg1,arg2)`, as produced by Javadoc from JDK 10.
    Modern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavadocLinker {
    base_url: String,
    style: AnchorStyle,
}

impl JavadocLinker {
    pub fn new(base_url: impl Into<String>, style: AnchorStyle) -> Self {
        let mut base_url = base_url.into();
        if !base_url.is_empty() && !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url, style }
    }

    pub fn class_url(&self, class: &ClassDescriptor) -> String {
        format!("{}{}", self.base_url, class_page(class))
    }

    pub fn method_url(&self, class: &ClassDescriptor, method: &MethodDescriptor) -> String {
        format!(
            "{}#{}",
            self.class_url(class),
            method_anchor(class, method, self.style)
        )
    }
}

/// Page path relative to the Javadoc root, e.g. `com/example/Outer.Inner.html`.
pub fn class_page(class: &ClassDescriptor) -> String {
    let page = class.simple_name().replace('$', ".");
    match class.package() {
        "" => format!("{page}.html"),
        package => format!("{}/{page}.html", package.replace('.', "/")),
    }
}

pub fn method_anchor(class: &ClassDescriptor, method: &MethodDescriptor, style: AnchorStyle) -> String {
    let name = if method.is_constructor() {
        class
            .simple_name()
            .rsplit('$')
            .next()
            .unwrap_or(class.simple_name())
    } else {
        method.name()
    };

    let mut arguments: Vec<String> = method.argument_types().to_vec();
    if method.is_varargs() {
        if let Some(last) = arguments.last_mut() {
            if let Some(element) = last.strip_suffix("[]") {
                *last = format!("{element}...");
            }
        }
    }

    match style {
        AnchorStyle::Legacy => format!("{name}-{}-", arguments.join("-")),
        AnchorStyle::Modern => format!("{name}({})", arguments.join(",")),
    }
}
