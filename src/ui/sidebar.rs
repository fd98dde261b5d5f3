use gtk4::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::models::{Chat, ChatId};

pub struct Sidebar {
    root: gtk::Box,
    list: gtk::ListBox,
    // Row index -> chat id, in list order.
    ids: Rc<RefCell<Vec<ChatId>>>,
}

impl Sidebar {
    pub fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_width_request(260);

        let title = gtk::Label::new(Some("Chats"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::Single);
        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .child(&list)
            .build();
        root.append(&scroller);

        Self { root, list, ids: Rc::new(RefCell::new(Vec::new())) }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn connect_chat_activated<F: Fn(ChatId) + 'static>(&self, f: F) {
        let ids = self.ids.clone();
        self.list.connect_row_activated(move |_, row| {
            let chat_id = usize::try_from(row.index()).ok().and_then(|i| ids.borrow().get(i).copied());
            if let Some(chat_id) = chat_id {
                f(chat_id);
            }
        });
    }

    /// Redraws every row in the given order and selects `highlighted`.
    pub fn set_items(&self, items: &[Chat], highlighted: Option<ChatId>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        let mut ids = self.ids.borrow_mut();
        ids.clear();
        for chat in items {
            let row = gtk::ListBoxRow::new();
            row.set_child(Some(&chat_row(chat)));
            self.list.append(&row);
            if highlighted == Some(chat.chat_id) {
                self.list.select_row(Some(&row));
            }
            ids.push(chat.chat_id);
        }
        if highlighted.is_none() {
            self.list.unselect_all();
        }
    }
}

fn chat_row(chat: &Chat) -> gtk::Box {
    let row = gtk::Box::new(gtk::Orientation::Horizontal, 8);
    row.set_margin_top(8);
    row.set_margin_bottom(8);
    row.set_margin_start(8);
    row.set_margin_end(8);

    let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
    text.set_hexpand(true);
    let name = gtk::Label::new(Some(&chat.participant_name));
    name.set_halign(gtk::Align::Start);
    text.append(&name);
    let preview = gtk::Label::new(Some(chat.last_message_text.as_deref().unwrap_or("")));
    preview.add_css_class("dim-label");
    preview.set_halign(gtk::Align::Start);
    preview.set_ellipsize(gtk::pango::EllipsizeMode::End);
    text.append(&preview);
    row.append(&text);

    let meta = gtk::Box::new(gtk::Orientation::Vertical, 2);
    let time = chat
        .last_message_time
        .as_deref()
        .map(crate::utils::format_timestamp)
        .unwrap_or_default();
    let time = gtk::Label::new(Some(&time));
    time.add_css_class("dim-label");
    time.add_css_class("caption");
    meta.append(&time);
    if chat.unread > 0 {
        let badge = gtk::Label::new(Some(&chat.unread.to_string()));
        badge.add_css_class("accent");
        badge.set_halign(gtk::Align::End);
        meta.append(&badge);
    }
    row.append(&meta);
    row
}
