//! Print the page tree of a site

use anyhow::Result;

use crate::page::{HandlerRegistry, OrderKey, PageNode};
use crate::Pcms;

/// Build the tree and print it
pub fn run(pcms: &Pcms, registry: &HandlerRegistry) -> Result<()> {
    let root = pcms.build_tree(registry)?;
    print!("{}", render_tree(&root));
    Ok(())
}

/// One line per page, indented by depth
pub fn render_tree(root: &PageNode) -> String {
    let mut out = String::new();
    for page in root.iter() {
        out.push_str(&format!(
            "{}{} [{}] {}",
            "  ".repeat(page.depth),
            page.route,
            page.page_type.as_str(),
            page.page_index
        ));
        match &page.page_config.order {
            Some(OrderKey::Number(n)) => out.push_str(&format!(" order={}", n)),
            Some(OrderKey::Text(s)) => out.push_str(&format!(" order={:?}", s)),
            None => {}
        }
        if !page.page_config.enabled {
            out.push_str(" disabled");
        }
        if page.page_config.is_protected() {
            out.push_str(" protected");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_tree() {
        let mut root = PageNode::synthetic("/");
        let mut about = PageNode::synthetic("/about");
        about.depth = 1;
        about.page_config.order = Some(OrderKey::Number(2.0));
        about.page_config.required_users = Some(vec!["alice".to_string()]);
        let mut off = PageNode::synthetic("/off");
        off.depth = 1;
        off.page_config.enabled = false;
        off.page_config.order = Some(OrderKey::Text("z".to_string()));
        root.child_pages = vec![about, off];
        root.index_children();

        assert_eq!(
            render_tree(&root),
            "/ [html] index.html\n  /about [html] index.html order=2 protected\n  /off [html] index.html order=\"z\" disabled\n"
        );
    }
}
