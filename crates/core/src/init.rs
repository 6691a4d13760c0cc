//! The bootstrap program, evaluated when a machine is created with the
//! standard library. It defines the accessor shorthands and the handful
//! of macros everything else takes for granted; `setq` in particular is
//! itself a macro over `set`.

pub(crate) const BOOTSTRAP: &str = r#"
(defun caar (c) (car (car c)))
(defun cadr (c) (nth 1 c))
(defun cdar (c) (cdr (car c)))
(defun cddr (c) (cdr (cdr c)))
(defun car-safe (o) (let ((x o)) (if (consp x) (car x) nil)))
(defun cdr-safe (o) (let ((x o)) (if (consp x) (cdr x) nil)))
(defmacro pop (l) (list 'prog1 (list 'car l) (list 'setq l (list 'cdr l))))
(defmacro push (e l) (list 'setq l (list 'cons e l)))
(defmacro setq (s v) (list 'set (list 'quote s) v))
"#;
