use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Состояние диалога пользователя.
///
/// У каждого пользователя в любой момент времени есть ровно один флаг
/// ожидания ввода (или `Idle`). Свободный текст обрабатывается согласно
/// текущему состоянию; при `Idle` он молча игнорируется.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    /// Нет ожидаемого ввода
    Idle,
    /// Ожидается номер квартиры (после /home)
    AwaitingApartment,
    /// Ожидается номер телефона; номер квартиры уже получен
    AwaitingPhone {
        /// Номер квартиры из предыдущего шага
        apartment_number: i64,
    },
    /// Ожидается номер квартиры для поиска (после /who_lives)
    AwaitingLookup,
}

/// Реестр состояний диалогов для всех пользователей.
///
/// Состояние транзиентно и не сохраняется в базе данных: перезапуск бота
/// сбрасывает все диалоги. Реестр принадлежит диспетчеру (передается через
/// `HandlerDeps`), а не глобальному контексту.
#[derive(Clone)]
pub struct DialogueRegistry {
    /// Состояния пользователей, находящихся в середине диалога
    states: Arc<Mutex<HashMap<i64, DialogueState>>>,
}

impl DialogueRegistry {
    /// Создает пустой реестр.
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Возвращает текущее состояние пользователя.
    ///
    /// Пользователь без записи в реестре находится в состоянии `Idle`.
    pub async fn get(&self, user_id: i64) -> DialogueState {
        let states = self.states.lock().await;
        states.get(&user_id).cloned().unwrap_or(DialogueState::Idle)
    }

    /// Устанавливает состояние пользователя.
    ///
    /// `Idle` удаляет запись из реестра, поэтому реестр содержит только
    /// пользователей в середине диалога и не растет неограниченно.
    pub async fn set(&self, user_id: i64, state: DialogueState) {
        let mut states = self.states.lock().await;
        if state == DialogueState::Idle {
            states.remove(&user_id);
        } else {
            states.insert(user_id, state);
        }
    }
}

impl Default for DialogueRegistry {
    fn default() -> Self {
        Self::new()
    }
}
