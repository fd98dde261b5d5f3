use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use std::rc::Rc;

use crate::api::client::ApiClient;
use crate::app::AppConfig;

pub fn show_login_window(app: &Application) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Webchat Login")
        .default_width(420)
        .default_height(260)
        .resizable(false)
        .build();

    let toast_overlay = adw::ToastOverlay::new();

    // Root container
    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Connect to Webchat"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let server_entry = gtk::Entry::new();
    server_entry.set_placeholder_text(Some("Server URL (e.g. http://localhost:8000)"));
    server_entry.set_hexpand(true);

    // The JWT the server issues as the access_token cookie
    let token_entry = gtk::PasswordEntry::new();
    token_entry.set_placeholder_text(Some("Access token"));
    token_entry.set_hexpand(true);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&server_entry);
    form.append(&token_entry);
    root.append(&form);

    let status = gtk::Label::new(None);
    status.add_css_class("dim-label");
    status.set_halign(gtk::Align::Start);
    root.append(&status);

    let login_btn = gtk::Button::with_label("Connect");
    login_btn.add_css_class("suggested-action");
    login_btn.set_halign(gtk::Align::End);
    root.append(&login_btn);

    toast_overlay.set_child(Some(&root));
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let header_title = gtk::Label::new(Some("Webchat"));
    header.set_title_widget(Some(&header_title));
    container.append(&header);
    container.append(&toast_overlay);
    window.set_content(Some(&container));

    let on_connect = {
        let app = app.clone();
        let window = window.clone();
        let overlay = toast_overlay.clone();
        let server_entry = server_entry.clone();
        let token_entry = token_entry.clone();
        move || {
            let url = crate::utils::normalize_url(&server_entry.text());
            let token = token_entry.text().trim().to_string();
            if url.is_empty() {
                overlay.add_toast(adw::Toast::new("Please enter the server URL."));
                return;
            }

            status.set_label("Connecting…");

            // A chat list fetch proves both the address and the token.
            let config = AppConfig {
                base_url: url,
                access_token: Some(token).filter(|t| !t.is_empty()),
            };
            let client = ApiClient::new(&config.base_url, config.access_token.clone());
            let rx = crate::utils::run_async_to_main(async move { client.chats().await });

            let status_label = status.clone();
            let app2 = app.clone();
            let window2 = window.clone();
            let overlay2 = overlay.clone();
            rx.attach(None, move |res| {
                match res {
                    Ok(chats) => {
                        log::info!("Connected to {} ({} chats)", config.base_url, chats.len());
                        if let Err(e) = config.save() {
                            log::error!("Failed to save config: {e}");
                            overlay2.add_toast(adw::Toast::new(&format!("Failed to save settings: {}", e)));
                        }
                        crate::ui::main_window::show_main_window(&app2, config.clone());
                        window2.close();
                    }
                    Err(err) => {
                        log::error!("Server check failed: {err}");
                        status_label.set_label("Connection failed");
                        overlay2.add_toast(adw::Toast::new("Could not reach the server. Check URL and token."));
                    }
                }
                glib::ControlFlow::Continue
            });
        }
    };

    let on_connect: Rc<dyn Fn()> = Rc::new(on_connect);
    {
        let on_connect = on_connect.clone();
        login_btn.connect_clicked(move |_| (on_connect)());
    }
    // Enter key in either field triggers connect
    {
        let on_connect = on_connect.clone();
        server_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        token_entry.connect_activate(move |_| (on_connect)());
    }

    window.present();
}
