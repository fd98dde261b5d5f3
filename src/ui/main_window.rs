use adw::prelude::*;
use adw::Application;
use std::rc::Rc;
use tokio::sync::mpsc;

use crate::api::client::ApiClient;
use crate::api::stream::MessageStream;
use crate::app::AppConfig;
use crate::session::{ChatRenderer, ChatSession};
use crate::ui::chat_view::ChatView;
use crate::ui::sidebar::Sidebar;
use crate::view_model::{ChatViewModel, ViewChange};

pub type Session = ChatSession<ApiClient>;

/// Projects view-model state onto the sidebar and the chat pane.
struct GtkRenderer {
    sidebar: Rc<Sidebar>,
    chat: Rc<ChatView>,
}

impl ChatRenderer for GtkRenderer {
    fn render(&self, model: &ChatViewModel, change: &ViewChange) {
        match change {
            ViewChange::ChatList => self.sidebar.set_items(model.chats(), model.highlighted()),
            ViewChange::Conversation => {
                self.sidebar.set_items(model.chats(), model.highlighted());
                self.chat
                    .show_conversation(model.active(), model.messages(), model.highlighted().is_some());
            }
            ViewChange::MessageAppended(message) => {
                self.chat.append_message(message);
                self.sidebar.set_items(model.chats(), model.highlighted());
            }
            ViewChange::Connection(_) => self.chat.set_connection(model.stream_state()),
        }
    }
}

pub fn show_main_window(app: &Application, config: AppConfig) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Webchat")
        .default_width(960)
        .default_height(640)
        .build();

    let split = adw::Flap::builder()
        .reveal_flap(true)
        .locked(true)
        .modal(false)
        .build();

    let sidebar = Rc::new(Sidebar::new());
    split.set_flap(Some(&sidebar.widget()));

    let chat = Rc::new(ChatView::new());
    split.set_content(Some(&chat.widget()));

    let container = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk4::Label::new(Some("Webchat"));
    header.set_title_widget(Some(&title));

    let new_chat_btn = gtk4::Button::with_label("New Chat");
    new_chat_btn.add_css_class("suggested-action");
    header.pack_end(&new_chat_btn);
    container.append(&header);
    container.append(&split);
    window.set_content(Some(&container));
    window.present();

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let stream = match crate::utils::ws_url(&config.base_url) {
        Ok(url) => MessageStream::connect(url, config.access_token.clone(), events_tx),
        Err(err) => {
            log::error!("Cannot derive stream address from {}: {err}", config.base_url);
            // Never opens; sends are refused until the config is fixed.
            drop(events_tx);
            MessageStream::disconnected()
        }
    };

    let renderer = GtkRenderer { sidebar: sidebar.clone(), chat: chat.clone() };
    let session: Rc<Session> = Rc::new(ChatSession::new(
        ApiClient::new(&config.base_url, config.access_token.clone()),
        Box::new(stream),
        Box::new(renderer),
    ));

    {
        let session = session.clone();
        sidebar.connect_chat_activated(move |chat_id| {
            let session = session.clone();
            glib::MainContext::default().spawn_local(async move {
                let _ = session.activate_chat(chat_id).await;
            });
        });
    }

    {
        let session = session.clone();
        chat.connect_send(move |text| matches!(session.send_outgoing(text), Ok(true)));
    }

    {
        let session = session.clone();
        glib::MainContext::default().spawn_local(async move {
            while let Some(event) = events_rx.recv().await {
                session.handle_stream_event(event);
            }
        });
    }

    {
        let session = session.clone();
        glib::MainContext::default().spawn_local(async move {
            let _ = session.load_chat_list().await;
        });
    }

    {
        let window = window.clone();
        new_chat_btn.connect_clicked(move |_| {
            crate::ui::new_chat::show_new_chat_dialog(&window, session.clone());
        });
    }
}
