use gtk4::prelude::*;
use gtk4 as gtk;
use std::rc::Rc;

use crate::api::models::Message;
use crate::api::stream::StreamState;
use crate::view_model::ActiveChat;

pub struct ChatView {
    root: gtk::Box,
    title: gtk::Label,
    presence: gtk::Label,
    connection: gtk::Label,
    scroller: gtk::ScrolledWindow,
    messages_box: gtk::Box,
    entry: gtk::Entry,
    send_btn: gtk::Button,
}

impl ChatView {
    pub fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let header = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let title = gtk::Label::new(Some("Select a chat"));
        title.add_css_class("title-4");
        let presence = gtk::Label::new(None);
        presence.add_css_class("caption");
        let connection = gtk::Label::new(None);
        connection.add_css_class("dim-label");
        connection.set_hexpand(true);
        connection.set_halign(gtk::Align::End);
        header.append(&title);
        header.append(&presence);
        header.append(&connection);
        root.append(&header);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&messages_box));
        root.append(&scroller);

        // Input row
        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Type a message…"));
        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        input_row.append(&entry);
        input_row.append(&send_btn);
        root.append(&input_row);

        let view = Self { root, title, presence, connection, scroller, messages_box, entry, send_btn };
        view.set_input_enabled(false);
        view
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// `send` gets the entry text and returns whether it went out; the entry
    /// is cleared only then.
    pub fn connect_send<F: Fn(&str) -> bool + 'static>(&self, send: F) {
        let entry = self.entry.clone();
        let send: Rc<dyn Fn()> = Rc::new(move || {
            if send(&entry.text()) {
                entry.set_text("");
            }
        });
        {
            let send = send.clone();
            self.send_btn.connect_clicked(move |_| (send)());
        }
        self.entry.connect_activate(move |_| (send)());
    }

    /// Replaces the whole pane. `pending` is set while the chat detail is loading.
    pub fn show_conversation(&self, active: Option<&ActiveChat>, messages: &[Message], pending: bool) {
        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }
        match active {
            Some(chat) => {
                self.title.set_label(&chat.participant_name);
                self.presence.set_label(if chat.is_online { "Online" } else { "Offline" });
                self.presence.remove_css_class(if chat.is_online { "error" } else { "success" });
                self.presence.add_css_class(if chat.is_online { "success" } else { "error" });
            }
            None => {
                self.title.set_label(if pending { "Loading…" } else { "Select a chat" });
                self.presence.set_label("");
            }
        }
        for message in messages {
            self.messages_box.append(&message_bubble(message));
        }
        self.set_input_enabled(active.is_some());
        self.scroll_to_end();
    }

    pub fn append_message(&self, message: &Message) {
        self.messages_box.append(&message_bubble(message));
        self.scroll_to_end();
    }

    pub fn set_connection(&self, state: StreamState) {
        let label = match state {
            StreamState::Open => String::new(),
            other => format!("Stream {other}"),
        };
        self.connection.set_label(&label);
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.entry.set_sensitive(enabled);
        self.send_btn.set_sensitive(enabled);
    }

    fn scroll_to_end(&self) {
        let adj = self.scroller.vadjustment();
        adj.set_value(adj.upper());
    }
}

fn message_bubble(message: &Message) -> gtk::Box {
    let bubble = gtk::Box::new(gtk::Orientation::Horizontal, 8);
    bubble.set_halign(if message.is_mine { gtk::Align::End } else { gtk::Align::Start });
    bubble.add_css_class("card");

    let text = gtk::Label::new(Some(&message.text));
    text.set_wrap(true);
    text.set_selectable(true);
    text.set_margin_top(4);
    text.set_margin_bottom(4);
    text.set_margin_start(8);
    bubble.append(&text);

    let time = gtk::Label::new(Some(&message.display_time()));
    time.add_css_class("dim-label");
    time.add_css_class("caption");
    time.set_margin_end(8);
    bubble.append(&time);
    bubble
}
