//! Browser-like globals installed in every realm before the document script.
//!
//! Realm code sees `window`, `parent`, `console`, timers, event listeners and
//! a permissive `document`. `parent.postMessage` serializes its argument into
//! an outbox the driver drains through `__playground_host__.drainOutbox()`.
//! Timers run on a virtual clock advanced by the driver one callback at a
//! time.

/// Global the driver uses to hand a JS value to host functions.
pub const PENDING_GLOBAL: &str = "__playground_pending__";

pub const HOST_ENV: &str = r#"(function (global) {
  'use strict';
  var stringify = JSON.stringify;
  var outbox = [];
  var listeners = {};
  var timers = [];
  var clock = 0;
  var seq = 0;

  var describe = function (value) {
    if (typeof value === 'string') {
      return value;
    }
    if (value instanceof Error) {
      return value.name + ': ' + value.message;
    }
    if (value && typeof value === 'object') {
      try {
        return stringify(value);
      } catch (e) {
        return String(value);
      }
    }
    return String(value);
  };

  var messageOf = function (value) {
    if (value && typeof value === 'object' && 'message' in value) {
      return String(value.message);
    }
    return String(value);
  };

  var post = function (data) {
    var text = stringify(data);
    outbox.push(text === undefined ? 'null' : text);
  };

  var dispatch = function (type, event) {
    var list = listeners[type];
    if (!list) {
      return;
    }
    list = list.slice();
    for (var i = 0; i < list.length; i++) {
      try {
        list[i].call(global, event);
      } catch (e) {
        if (type !== 'error') {
          reportError(e);
        }
      }
    }
  };

  var reportError = function (error) {
    dispatch('error', { type: 'error', message: messageOf(error), error: error });
  };

  var schedule = function (callback, delay, args, repeat) {
    var ms = Number(delay);
    if (!(ms > 0)) {
      ms = 0;
    }
    seq += 1;
    var timer = {
      id: seq,
      order: seq,
      at: clock + ms,
      callback: callback,
      args: args,
      interval: repeat ? Math.max(ms, 1) : 0
    };
    timers.push(timer);
    return timer.id;
  };

  var clear = function (id) {
    timers = timers.filter(function (t) { return t.id !== id; });
  };

  var runNextTimer = function () {
    if (timers.length === 0) {
      return false;
    }
    var next = 0;
    for (var i = 1; i < timers.length; i++) {
      var t = timers[i];
      var n = timers[next];
      if (t.at < n.at || (t.at === n.at && t.order < n.order)) {
        next = i;
      }
    }
    var timer = timers.splice(next, 1)[0];
    clock = timer.at;
    if (timer.interval > 0) {
      seq += 1;
      timers.push({
        id: timer.id,
        order: seq,
        at: clock + timer.interval,
        callback: timer.callback,
        args: timer.args,
        interval: timer.interval
      });
    }
    try {
      if (typeof timer.callback === 'function') {
        timer.callback.apply(global, timer.args);
      } else {
        (0, eval)(String(timer.callback));
      }
    } catch (e) {
      reportError(e);
    }
    return true;
  };

  var rest = function (args, from) {
    return Array.prototype.slice.call(args, from);
  };

  global.window = global;
  global.self = global;
  global.parent = global;
  global.top = global;

  global.postMessage = function (data) {
    post(data);
  };

  var consoleMethod = function (level) {
    return function () {
      var parts = [];
      for (var i = 0; i < arguments.length; i++) {
        parts.push(describe(arguments[i]));
      }
      post({ type: 'playground_console', level: level, message: parts.join(' ') });
    };
  };
  global.console = {
    log: consoleMethod('log'),
    info: consoleMethod('info'),
    warn: consoleMethod('warn'),
    error: consoleMethod('error'),
    debug: consoleMethod('debug')
  };

  global.addEventListener = function (type, listener) {
    if (typeof listener !== 'function') {
      return;
    }
    var list = listeners[type] || (listeners[type] = []);
    if (list.indexOf(listener) < 0) {
      list.push(listener);
    }
  };
  global.removeEventListener = function (type, listener) {
    var list = listeners[type];
    if (list) {
      listeners[type] = list.filter(function (l) { return l !== listener; });
    }
  };

  global.setTimeout = function (callback, delay) {
    return schedule(callback, delay, rest(arguments, 2), false);
  };
  global.setInterval = function (callback, delay) {
    return schedule(callback, delay, rest(arguments, 2), true);
  };
  global.clearTimeout = clear;
  global.clearInterval = clear;
  global.requestAnimationFrame = function (callback) {
    return schedule(function () { callback(clock); }, 16, [], false);
  };
  global.cancelAnimationFrame = clear;
  global.queueMicrotask = function (callback) {
    Promise.resolve().then(function () {
      try {
        callback();
      } catch (e) {
        reportError(e);
      }
    });
  };

  global.alert = function () {};
  global.confirm = function () { return false; };
  global.prompt = function () { return null; };

  global.navigator = { userAgent: 'learnhub-playground', language: 'en-US' };
  global.performance = { now: function () { return clock; } };

  var makeElement = function (tag) {
    var classes = [];
    var attributes = {};
    var element = {
      tagName: String(tag).toUpperCase(),
      nodeName: String(tag).toUpperCase(),
      id: '',
      className: '',
      innerHTML: '',
      innerText: '',
      textContent: '',
      value: '',
      checked: false,
      disabled: false,
      hidden: false,
      style: {},
      dataset: {},
      children: [],
      childNodes: [],
      parentNode: null,
      classList: {
        add: function () { for (var i = 0; i < arguments.length; i++) { if (classes.indexOf(arguments[i]) < 0) classes.push(arguments[i]); } },
        remove: function () { var gone = Array.prototype.slice.call(arguments); classes = classes.filter(function (c) { return gone.indexOf(c) < 0; }); },
        toggle: function (c) { var at = classes.indexOf(c); if (at < 0) { classes.push(c); return true; } classes.splice(at, 1); return false; },
        contains: function (c) { return classes.indexOf(c) >= 0; }
      },
      setAttribute: function (k, v) { attributes[k] = String(v); },
      getAttribute: function (k) { return Object.prototype.hasOwnProperty.call(attributes, k) ? attributes[k] : null; },
      hasAttribute: function (k) { return Object.prototype.hasOwnProperty.call(attributes, k); },
      removeAttribute: function (k) { delete attributes[k]; },
      appendChild: function (child) { this.children.push(child); this.childNodes.push(child); if (child && typeof child === 'object') child.parentNode = this; return child; },
      append: function () { for (var i = 0; i < arguments.length; i++) this.appendChild(arguments[i]); },
      prepend: function () { for (var i = 0; i < arguments.length; i++) { this.children.unshift(arguments[i]); this.childNodes.unshift(arguments[i]); } },
      removeChild: function (child) { this.children = this.children.filter(function (c) { return c !== child; }); this.childNodes = this.children.slice(); return child; },
      remove: function () { if (this.parentNode) this.parentNode.removeChild(this); },
      insertBefore: function (child) { return this.appendChild(child); },
      replaceChildren: function () { this.children = []; this.childNodes = []; this.append.apply(this, arguments); },
      cloneNode: function () { return makeElement(tag); },
      addEventListener: function () {},
      removeEventListener: function () {},
      dispatchEvent: function () { return true; },
      click: function () {},
      focus: function () {},
      blur: function () {},
      querySelector: function () { return makeElement('div'); },
      querySelectorAll: function () { return []; },
      getElementsByTagName: function () { return []; },
      getElementsByClassName: function () { return []; },
      closest: function () { return null; },
      matches: function () { return false; },
      getBoundingClientRect: function () { return { x: 0, y: 0, top: 0, left: 0, right: 0, bottom: 0, width: 0, height: 0 }; }
    };
    return element;
  };

  var body = makeElement('body');
  var head = makeElement('head');
  var root = makeElement('html');
  root.appendChild(head);
  root.appendChild(body);

  global.document = {
    readyState: 'loading',
    title: '',
    body: body,
    head: head,
    documentElement: root,
    createElement: function (tag) { return makeElement(tag); },
    createTextNode: function (text) { return { nodeName: '#text', textContent: String(text) }; },
    createDocumentFragment: function () { return makeElement('#fragment'); },
    getElementById: function (id) { var el = makeElement('div'); el.id = String(id); return el; },
    querySelector: function () { return makeElement('div'); },
    querySelectorAll: function () { return []; },
    getElementsByTagName: function () { return []; },
    getElementsByClassName: function () { return []; },
    addEventListener: global.addEventListener,
    removeEventListener: global.removeEventListener
  };

  // Runs after the document script, before any user timer.
  schedule(function () {
    global.document.readyState = 'complete';
    dispatch('DOMContentLoaded', { type: 'DOMContentLoaded' });
    dispatch('load', { type: 'load' });
    if (typeof global.onload === 'function') {
      try {
        global.onload({ type: 'load' });
      } catch (e) {
        reportError(e);
      }
    }
  }, 0, [], false);

  Object.defineProperty(global, '__playground_host__', {
    value: Object.freeze({
      reportError: reportError,
      reportRejection: function (promise) {
        promise.then(null, function (reason) {
          dispatch('unhandledrejection', { type: 'unhandledrejection', reason: reason, promise: promise });
        });
      },
      runNextTimer: runNextTimer,
      drainOutbox: function () {
        var drained = outbox;
        outbox = [];
        var text = '[';
        for (var i = 0; i < drained.length; i++) {
          if (i > 0) {
            text += ',';
          }
          text += drained[i];
        }
        return text + ']';
      }
    }),
    writable: false,
    enumerable: false,
    configurable: false
  });
})(globalThis);
"#;
