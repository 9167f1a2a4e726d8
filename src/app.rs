use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

use crate::auth::AuthState;
use crate::config::AppConfig;
use crate::deck::{CardGrid, GameSession};
use crate::inventory::{Filter, Item, ItemType, Location, Tracker};
use crate::store::LocalStore;

/// Cards per row on the game screen
pub const CARD_COLUMNS: usize = 4;

/// Seconds a status message stays visible
const STATUS_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Inventory,
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    AddItem,
    Help,
    ConfirmDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Quantity,
    Location,
    Type,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Quantity,
            FormField::Quantity => FormField::Location,
            FormField::Location => FormField::Type,
            FormField::Type => FormField::Name,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Name => FormField::Type,
            FormField::Quantity => FormField::Name,
            FormField::Location => FormField::Quantity,
            FormField::Type => FormField::Location,
        }
    }
}

/// Add-item form state
#[derive(Debug, Clone)]
pub struct AddItemForm {
    pub name: String,
    pub quantity: String,
    pub location: Location,
    pub item_type: ItemType,
    pub field: FormField,
}

impl AddItemForm {
    fn new(location: Location, item_type: ItemType) -> Self {
        Self {
            name: String::new(),
            quantity: "1".to_string(),
            location,
            item_type,
            field: FormField::Name,
        }
    }

    /// Clear name and quantity, keep the chosen location and type
    fn reset(&mut self) {
        self.name.clear();
        self.quantity = "1".to_string();
        self.field = FormField::Name;
    }

    /// Quantity as typed; unparsable input counts as 0 so validation rejects it
    pub fn quantity_value(&self) -> i64 {
        self.quantity.trim().parse().unwrap_or(0)
    }
}

pub struct App {
    pub screen: Screen,
    pub popup: Popup,

    // Inventory
    pub tracker: Tracker<LocalStore>,
    pub auth: AuthState,
    pub selected_item: usize,
    pub form: AddItemForm,
    pub pending_delete: Option<Item>,

    // Card game
    pub game: GameSession<StdRng>,
    pub grid: CardGrid,
    pub selected_card: usize,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
}

impl App {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let auth = crate::auth::sign_in(config.auth_token.as_deref());

        let data_dir = config.data_dir()?;
        let store = LocalStore::open(&data_dir)
            .with_context(|| format!("Could not open item store in {}", data_dir.display()))?;
        let tracker = Tracker::new(store, config.collection_path(), auth.user_id.clone());

        let mut game = GameSession::new(config.pairs(), StdRng::from_entropy());
        let mut grid = CardGrid::new();
        game.initialize_game(&mut grid);

        let mut app = Self {
            screen: Screen::Inventory,
            popup: Popup::None,

            tracker,
            auth,
            selected_item: 0,
            form: AddItemForm::new(config.default_location, config.default_item_type),
            pending_delete: None,

            game,
            grid,
            selected_card: 0,

            status_message: None,
            status_message_time: None,
        };

        // Only watch once sign-in has settled, successful or not
        if app.auth.is_ready() {
            if let Err(e) = app.tracker.watch().await {
                tracing::error!("Error fetching items: {}", e);
                app.set_status(format!("Could not load items: {}", e));
            }
        }

        Ok(app)
    }

    /// Set a status message (auto-clears after a few seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Item under the cursor in the current grouped view
    pub fn selected(&self) -> Option<Item> {
        self.tracker.view().items().nth(self.selected_item).cloned()
    }

    fn visible_item_count(&self) -> usize {
        self.tracker.view().items().count()
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_item_count();
        if count == 0 {
            self.selected_item = 0;
        } else if self.selected_item >= count {
            self.selected_item = count - 1;
        }

        if self.selected_card >= self.grid.len() {
            self.selected_card = self.grid.len().saturating_sub(1);
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key).await;
        }

        match key.code {
            KeyCode::Tab => {
                self.screen = match self.screen {
                    Screen::Inventory => Screen::Game,
                    Screen::Game => Screen::Inventory,
                };
                return Ok(());
            }
            KeyCode::Char('?') => {
                self.popup = Popup::Help;
                return Ok(());
            }
            _ => {}
        }

        match self.screen {
            Screen::Inventory => self.handle_inventory_key(key).await,
            Screen::Game => {
                self.handle_game_key(key);
                Ok(())
            }
        }
    }

    async fn handle_inventory_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                let count = self.visible_item_count();
                if count > 0 {
                    self.selected_item = (self.selected_item + 1) % count;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let count = self.visible_item_count();
                if count > 0 {
                    self.selected_item = self.selected_item.checked_sub(1).unwrap_or(count - 1);
                }
            }

            // Filters
            KeyCode::Char('f') => self.set_filter(self.tracker.filter().next()),
            KeyCode::Char('1') => self.set_filter(Filter::All),
            KeyCode::Char('2') => self.set_filter(Filter::Only(ItemType::PantryItem)),
            KeyCode::Char('3') => self.set_filter(Filter::Only(ItemType::Supply)),

            // Quantity
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right => self.adjust_selected(1).await,
            KeyCode::Char('-') | KeyCode::Left => self.adjust_selected(-1).await,

            KeyCode::Char('a') | KeyCode::Char('n') => {
                self.form.reset();
                self.popup = Popup::AddItem;
            }

            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(item) = self.selected() {
                    self.pending_delete = Some(item);
                    self.popup = Popup::ConfirmDelete;
                }
            }

            _ => {}
        }
        Ok(())
    }

    fn set_filter(&mut self, filter: Filter) {
        self.tracker.set_filter(filter);
        self.selected_item = 0;
        self.set_status(format!("Showing {}", filter.label()));
    }

    async fn adjust_selected(&mut self, delta: i64) {
        let Some(item) = self.selected() else {
            return;
        };
        if let Some(quantity) = self
            .tracker
            .adjust_quantity(&item.id, item.quantity(), delta)
            .await
        {
            self.set_status(format!("{}: {}", item.name(), quantity));
        }
    }

    fn handle_game_key(&mut self, key: KeyEvent) {
        let count = self.grid.len();
        match key.code {
            KeyCode::Char('n') | KeyCode::Char('r') => {
                self.game.initialize_game(&mut self.grid);
                self.selected_card = 0;
                self.set_status("New game");
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(card) = self.grid.flip(self.selected_card) {
                    if card.face_up {
                        let msg = format!("{} {}", card.icon, card.word);
                        self.set_status(msg);
                    }
                }
            }
            _ if count == 0 => {}
            KeyCode::Char('l') | KeyCode::Right => {
                self.selected_card = (self.selected_card + 1) % count;
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.selected_card = self.selected_card.checked_sub(1).unwrap_or(count - 1);
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected_card + CARD_COLUMNS < count {
                    self.selected_card += CARD_COLUMNS;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.selected_card >= CARD_COLUMNS {
                    self.selected_card -= CARD_COLUMNS;
                }
            }
            _ => {}
        }
    }

    async fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::AddItem => self.handle_form_key(key).await,
            Popup::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter | KeyCode::Char('q')) {
                    self.popup = Popup::None;
                }
                Ok(())
            }
            Popup::ConfirmDelete => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => {
                        if let Some(item) = self.pending_delete.take() {
                            if self.tracker.remove_item(&item.id).await {
                                self.set_status(format!("Removed {}", item.name()));
                            }
                        }
                        self.popup = Popup::None;
                    }
                    KeyCode::Char('n') | KeyCode::Esc => {
                        self.pending_delete = None;
                        self.popup = Popup::None;
                    }
                    _ => {}
                }
                Ok(())
            }
            Popup::None => Ok(()),
        }
    }

    async fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.popup = Popup::None,
            KeyCode::Enter => self.submit_form().await,
            KeyCode::Tab | KeyCode::Down => self.form.field = self.form.field.next(),
            KeyCode::BackTab | KeyCode::Up => self.form.field = self.form.field.prev(),
            code => match self.form.field {
                FormField::Name => match code {
                    KeyCode::Char(c) => self.form.name.push(c),
                    KeyCode::Backspace => {
                        self.form.name.pop();
                    }
                    _ => {}
                },
                FormField::Quantity => match code {
                    KeyCode::Char(c) if c.is_ascii_digit() => self.form.quantity.push(c),
                    KeyCode::Backspace => {
                        self.form.quantity.pop();
                    }
                    _ => {}
                },
                FormField::Location => {
                    if matches!(code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                        self.form.location = self.form.location.next();
                    }
                }
                FormField::Type => {
                    if matches!(code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                        self.form.item_type = self.form.item_type.next();
                    }
                }
            },
        }
        Ok(())
    }

    async fn submit_form(&mut self) {
        let name = self.form.name.clone();
        let quantity = self.form.quantity_value();

        if name.trim().is_empty() || quantity <= 0 {
            self.set_status("Please enter a valid item name and quantity.");
            return;
        }

        match self
            .tracker
            .add_item(&name, quantity, self.form.location, self.form.item_type)
            .await
        {
            Some(_) => {
                self.set_status(format!("Added {}", name.trim()));
                self.form.reset();
                self.popup = Popup::None;
            }
            None => self.set_status("Could not add item (see log)"),
        }
    }

    /// Periodic refresh: pull store snapshots, expire status messages
    pub async fn tick(&mut self) {
        self.tracker.sync().await;
        if self.tracker.refresh() {
            self.clamp_selection();
        }

        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_TIMEOUT_SECS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /// Release the store subscription before the terminal is restored
    pub fn shutdown(&mut self) {
        self.tracker.close();
        tracing::info!("Inventory subscription released");
    }
}
