use gtk4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::models::User;
use crate::ui::main_window::Session;
use crate::view_model::filter_users;

/// Searchable list of users; "Add" starts a chat and closes the dialog.
pub fn show_new_chat_dialog(parent: &adw::ApplicationWindow, session: Rc<Session>) {
    let dialog = gtk4::Dialog::builder()
        .title("Start New Chat")
        .transient_for(parent)
        .modal(true)
        .default_width(360)
        .default_height(420)
        .build();
    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);

    let search = gtk4::SearchEntry::new();
    search.set_placeholder_text(Some("Search by nickname"));
    content.append(&search);

    let list = gtk4::ListBox::new();
    list.set_selection_mode(gtk4::SelectionMode::None);
    let scroller = gtk4::ScrolledWindow::builder()
        .vexpand(true)
        .child(&list)
        .build();
    content.append(&scroller);

    dialog.set_child(Some(&content));
    let _ = dialog.add_button("Close", gtk4::ResponseType::Close);
    dialog.connect_response(|dlg, _| dlg.close());

    let users: Rc<RefCell<Vec<User>>> = Rc::new(RefCell::new(Vec::new()));

    let fill = {
        let users = users.clone();
        let list = list.clone();
        let search = search.clone();
        let dialog = dialog.clone();
        let session = session.clone();
        Rc::new(move || {
            while let Some(child) = list.first_child() {
                list.remove(&child);
            }
            let users = users.borrow();
            for user in filter_users(&users, &search.text()) {
                list.append(&user_row(user, &dialog, &session));
            }
        })
    };

    {
        let fill = fill.clone();
        search.connect_search_changed(move |_| (fill)());
    }

    glib::MainContext::default().spawn_local(async move {
        if let Ok(loaded) = session.load_users().await {
            *users.borrow_mut() = loaded;
            (fill)();
        }
    });

    dialog.present();
}

fn user_row(user: &User, dialog: &gtk4::Dialog, session: &Rc<Session>) -> gtk4::Box {
    let row = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    row.set_margin_top(4);
    row.set_margin_bottom(4);

    let name = gtk4::Label::new(Some(&user.nickname));
    name.set_hexpand(true);
    name.set_halign(gtk4::Align::Start);
    row.append(&name);

    let add_btn = gtk4::Button::with_label("Add");
    add_btn.add_css_class("suggested-action");
    row.append(&add_btn);

    let user_id = user.id;
    let dialog = dialog.clone();
    let session = session.clone();
    add_btn.connect_clicked(move |btn| {
        btn.set_sensitive(false);
        let btn = btn.clone();
        let dialog = dialog.clone();
        let session = session.clone();
        glib::MainContext::default().spawn_local(async move {
            match session.add_chat(user_id).await {
                Ok(()) => dialog.close(),
                Err(_) => btn.set_sensitive(true),
            }
        });
    });
    row
}
